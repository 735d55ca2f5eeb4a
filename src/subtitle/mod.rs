//! Timed-text export of recovered lines.
//!
//! Both formats are pure serializations of [`Lines`](crate::lyrics::word::Lines): exporting the
//! same lines twice yields byte-identical output.

/// LRC (`[mm:ss.xx]text`) export and parsing.
pub mod lrc;
/// SubRip (`.srt`) export.
pub mod srt;

/// Round a non-negative time in seconds to whole units of `1 / per_second`.
///
/// Negative and non-finite inputs clamp to zero.
pub(crate) fn round_to_units(secs: f64, per_second: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * per_second).round() as u64
}
