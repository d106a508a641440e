//! Pure delta extraction over a continuously replaced transcript.
//!
//! The speech source reports the *full* transcript on every update, so the
//! engine tracks a cursor: the number of leading bytes already dispatched
//! for analysis. `unsent_delta` cuts the suffix past the cursor, and
//! `reconcile_cursor` repairs the cursor when the source revises previously
//! reported interim text instead of growing the transcript by suffix only.
//!
//! All offsets are byte positions aligned to `char` boundaries.

/// Returns the portion of `transcript` not yet dispatched.
///
/// An out-of-range or misaligned cursor yields an empty delta rather than
/// panicking; the caller treats empty as "nothing to dispatch".
pub fn unsent_delta(transcript: &str, cursor: usize) -> &str {
    transcript.get(cursor..).unwrap_or("")
}

/// Reconcile the dispatch cursor against a wholesale transcript replacement.
///
/// Under append-only growth the previous transcript is a prefix of the new
/// one and the cursor passes through unchanged. When the source revises
/// text the engine has already dispatched, the cursor clamps back to the
/// end of the longest common prefix of the two transcripts, so the revised
/// tail is re-sent on the next tick. With no common prefix this degrades to
/// 0, i.e. the full remaining suffix is dispatched again.
pub fn reconcile_cursor(previous: &str, next: &str, cursor: usize) -> usize {
    let lcp = common_prefix_len(previous, next);
    let clamped = cursor.min(lcp).min(next.len());
    floor_char_boundary(next, clamped)
}

/// Length in bytes of the longest common prefix of `a` and `b`, aligned to
/// a `char` boundary of both.
fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}

/// Largest `char` boundary in `s` that is <= `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
