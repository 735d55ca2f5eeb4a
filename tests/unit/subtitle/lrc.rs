use super::*;
use crate::lyrics::word::AlignedWord;

fn line(text: &str, start: f64, end: f64) -> LineGroup {
    LineGroup::new(vec![AlignedWord::new(text, start, end)]).unwrap()
}

#[test]
fn tag_rounds_to_hundredths() {
    assert_eq!(format_lrc_tag(0.0), "[00:00.00]");
    assert_eq!(format_lrc_tag(62.346), "[01:02.35]");
    assert_eq!(format_lrc_tag(59.996), "[01:00.00]");
    assert_eq!(format_lrc_tag(3662.5), "[61:02.50]");
    assert_eq!(format_lrc_tag(f64::NAN), "[00:00.00]");
}

#[test]
fn exports_one_line_per_group() {
    let lines = vec![line("Hello world", 0.5, 1.0), line("Goodbye now", 12.25, 13.0)];
    assert_eq!(
        to_lrc(&lines),
        "[00:00.50]Hello world\n[00:12.25]Goodbye now\n"
    );
    assert_eq!(to_lrc(&[]), "");
}

#[test]
fn reparsed_tags_recover_start_times() {
    let starts = [0.0, 1.234, 9.999, 61.005, 125.5];
    let lines: Vec<LineGroup> = starts
        .iter()
        .map(|&s| line("la", s, s + 0.5))
        .collect();
    let parsed = parse_lrc(&to_lrc(&lines));
    assert_eq!(parsed.len(), starts.len());
    for (p, s) in parsed.iter().zip(starts) {
        assert!((p.time_s - s).abs() <= 0.005 + 1e-9, "{} vs {s}", p.time_s);
        assert_eq!(p.text, "la");
    }
}

#[test]
fn parse_handles_multi_tags_and_metadata() {
    let doc = "[ar:Someone]\n[ti:Song]\n[00:12.00][00:40.5]chorus\n[00:20]verse\nno tag here\n";
    let parsed = parse_lrc(doc);
    let got: Vec<(f64, &str)> = parsed.iter().map(|l| (l.time_s, l.text.as_str())).collect();
    assert_eq!(got, [(12.0, "chorus"), (20.0, "verse"), (40.5, "chorus")]);
}

#[test]
fn plain_text_drops_timestamps() {
    let doc = "[00:01.00]first line\n[00:02.00]\n[00:03.00]second line\n";
    assert_eq!(lrc_to_plain_text(doc), "first line\nsecond line");
}
