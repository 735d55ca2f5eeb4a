use crate::lyrics::word::LineGroup;
use crate::subtitle::round_to_units;

/// Serialize lines as LRC, one `[mm:ss.xx]text` line per group.
///
/// The tag is the group's first word start, rounded to hundredths of a second. Minutes are not
/// wrapped, so tracks over an hour produce `[61:02.50]`.
pub fn to_lrc(lines: &[LineGroup]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&format_lrc_tag(line.start_s()));
        out.push_str(&line.text());
        out.push('\n');
    }
    out
}

/// Format `secs` as an `[mm:ss.xx]` tag.
pub fn format_lrc_tag(secs: f64) -> String {
    let cs = round_to_units(secs, 100.0);
    format!("[{:02}:{:02}.{:02}]", cs / 6000, (cs / 100) % 60, cs % 100)
}

/// One timed line read back from an LRC document.
#[derive(Clone, Debug, PartialEq)]
pub struct LrcLine {
    /// Tag time in seconds.
    pub time_s: f64,
    /// Line text (may be empty).
    pub text: String,
}

/// Parse an LRC document into timed lines sorted by time.
///
/// Lines may carry several time tags (`[00:12.00][00:40.00]chorus`); each produces an entry.
/// Metadata tags such as `[ar:Artist]` and untagged lines are ignored.
pub fn parse_lrc(doc: &str) -> Vec<LrcLine> {
    let mut out = Vec::new();
    for raw in doc.lines() {
        let mut rest = raw.trim();
        let mut times = Vec::new();
        while let Some(body) = rest.strip_prefix('[') {
            let Some(close) = body.find(']') else {
                break;
            };
            let Some(t) = parse_lrc_time(&body[..close]) else {
                break;
            };
            times.push(t);
            rest = &body[close + 1..];
        }
        let text = rest.trim();
        out.extend(times.into_iter().map(|time_s| LrcLine {
            time_s,
            text: text.to_owned(),
        }));
    }
    out.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    out
}

/// Strip timing from an LRC document, leaving plain lyric text (one line per timed line).
pub fn lrc_to_plain_text(doc: &str) -> String {
    parse_lrc(doc)
        .into_iter()
        .map(|l| l.text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse `mm:ss`, `mm:ss.x`, `mm:ss.xx` or `mm:ss.xxx`.
fn parse_lrc_time(tag: &str) -> Option<f64> {
    let (mm, ss) = tag.split_once(':')?;
    if mm.is_empty() || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (whole, frac) = match ss.split_once(['.', ':']) {
        Some((w, f)) => (w, f),
        None => (ss, ""),
    };
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let minutes: f64 = mm.parse().ok()?;
    let seconds: f64 = whole.parse().ok()?;
    let fraction = if frac.is_empty() {
        0.0
    } else {
        frac.parse::<f64>().ok()? / 10f64.powi(frac.len() as i32)
    };
    Some(minutes * 60.0 + seconds + fraction)
}

#[cfg(test)]
#[path = "../../tests/unit/subtitle/lrc.rs"]
mod tests;
