use crate::lyrics::word::LineGroup;
use crate::subtitle::round_to_units;
use std::fmt::Write as _;

/// Serialize lines as SubRip cues numbered from 1.
///
/// Each cue spans the group's first word start to its last word end.
pub fn to_srt(lines: &[LineGroup]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(line.start_s()),
            format_srt_time(line.end_s()),
            line.text()
        );
    }
    out
}

/// Format `secs` as `HH:MM:SS,mmm`.
pub fn format_srt_time(secs: f64) -> String {
    let ms = round_to_units(secs, 1000.0);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}
