//! Last-write-wins slot for on-demand keyword explanations.

use std::sync::Mutex;

use glossa_core::types::ExplanationSet;

/// Holds the most recently fetched keyword explanation.
///
/// Lookups are fire-and-forget; whichever response arrives last overwrites
/// the slot, regardless of which keyword was requested first. The slot
/// survives session restarts — an explanation is still useful after the
/// session that produced it ends.
pub struct ExplanationSlot {
    current: Mutex<Option<ExplanationSet>>,
}

impl ExplanationSlot {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Replace the slot's content with a newly arrived explanation.
    pub fn replace(&self, set: ExplanationSet) {
        let mut current = match self.current.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = Some(set);
    }

    /// The most recently stored explanation, if any.
    pub fn get(&self) -> Option<ExplanationSet> {
        match self.current.lock() {
            Ok(c) => c.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for ExplanationSlot {
    fn default() -> Self {
        Self::new()
    }
}
