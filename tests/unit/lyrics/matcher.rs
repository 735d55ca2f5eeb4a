use super::*;

fn w(text: &str, start: f64, end: f64) -> AlignedWord {
    AlignedWord::new(text, start, end)
}

fn texts(lines: &Lines) -> Vec<String> {
    lines.iter().map(|l| l.text()).collect()
}

#[test]
fn reference_lines_split_groups() {
    let words = [
        w("Hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("Goodbye", 3.0, 3.5),
        w("now", 3.5, 4.0),
    ];
    let lines = match_lines(&words, "Hello world\nGoodbye now");
    assert_eq!(texts(&lines), ["Hello world", "Goodbye now"]);
}

#[test]
fn reference_breaks_win_over_timing() {
    // No pause between the two lines: timing alone would keep them together.
    let words = [
        w("Hello", 0.0, 0.3),
        w("world", 0.3, 0.6),
        w("Goodbye", 0.6, 0.9),
        w("now", 0.9, 1.2),
    ];
    let lines = match_lines(&words, "Hello world\nGoodbye now");
    assert_eq!(lines.len(), 2);
}

#[test]
fn empty_reference_falls_back_to_timing() {
    let words = [
        w("[Intro]", 0.0, 0.2),
        w("one", 0.3, 0.5),
        w("two", 0.5, 0.7),
        w("three", 4.0, 4.3),
    ];
    let lines = match_lines(&words, "");
    assert_eq!(lines, group_by_timing(&normalize_words(&words)));
    assert_eq!(texts(&lines), ["one two", "three"]);
}

#[test]
fn empty_words_give_empty_lines() {
    assert!(match_lines(&[], "Hello world").is_empty());
    assert!(match_lines(&[], "").is_empty());
}

#[test]
fn unmatched_words_stay_in_current_group() {
    let words = [
        w("Hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("yeah", 1.0, 1.3),
        w("Goodbye", 3.0, 3.5),
        w("now", 3.5, 4.0),
    ];
    let lines = match_lines(&words, "Hello world\nGoodbye now");
    assert_eq!(texts(&lines), ["Hello world yeah", "Goodbye now"]);
}

#[test]
fn contractions_match_after_normalization() {
    let words = [
        w("I", 0.0, 0.2),
        w("don", 0.2, 0.4),
        w("'t", 0.4, 0.5),
        w("know", 0.5, 0.9),
        w("why", 2.0, 2.4),
    ];
    let lines = match_lines(&words, "I don't know\nWhy");
    assert_eq!(texts(&lines), ["I don't know", "why"]);
}

#[test]
fn lost_matcher_resynchronizes_on_a_later_line() {
    let words = [
        w("one", 0.0, 0.3),
        w("two", 0.3, 0.6),
        w("three", 0.6, 0.9),
        w("la", 1.0, 1.2),
        w("la", 1.2, 1.4),
        w("la", 1.4, 1.6),
        w("la", 1.6, 1.8),
        w("seven", 2.0, 2.3),
        w("eight", 2.3, 2.6),
        w("nine", 2.6, 2.9),
    ];
    let lines = match_lines(&words, "one two three\nfour five six\nseven eight nine");
    assert_eq!(texts(&lines), ["one two three la la la la", "seven eight nine"]);
}

#[test]
fn long_gap_while_lost_closes_group() {
    let words = [
        w("one", 0.0, 0.5),
        w("two", 0.5, 1.0),
        w("three", 1.0, 1.5),
        w("xx", 1.6, 1.8),
        w("yy", 1.8, 2.0),
        w("zz", 2.0, 2.2),
        w("qq", 10.0, 10.5),
    ];
    let lines = match_lines(&words, "one two three");
    assert_eq!(texts(&lines), ["one two three xx yy zz", "qq"]);
}

#[test]
fn repeated_chorus_follows_pointer() {
    let reference = "la di da\nhey there\nla di da";
    let words = [
        w("la", 0.0, 0.2),
        w("di", 0.2, 0.4),
        w("da", 0.4, 0.6),
        w("hey", 0.8, 1.0),
        w("there", 1.0, 1.2),
        w("la", 1.4, 1.6),
        w("di", 1.6, 1.8),
        w("da", 1.8, 2.0),
    ];
    let lines = match_lines(&words, reference);
    assert_eq!(texts(&lines), ["la di da", "hey there", "la di da"]);
}

#[test]
fn detached_opener_starts_the_next_line() {
    let words = [
        w("hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("(", 3.0, 3.1),
        w("oh", 3.7, 4.0),
        w("yes)", 4.0, 4.3),
    ];
    let lines = match_lines(&words, "hello world\n(oh yes)");
    assert_eq!(texts(&lines), ["hello world", "( oh yes)"]);
}

#[test]
fn every_input_word_survives_in_order() {
    let words = [
        w("a", 0.0, 0.1),
        w("b", 0.1, 0.2),
        w("c", 5.0, 5.1),
        w("d", 5.1, 5.2),
    ];
    let lines = match_lines(&words, "x y\nz");
    let flat: Vec<&str> = lines
        .iter()
        .flat_map(|l| l.words().iter().map(|w| w.word.as_str()))
        .collect();
    assert_eq!(flat, ["a", "b", "c", "d"]);
}

#[test]
fn late_unmatched_word_does_not_stretch_the_last_line() {
    let words = [
        w("hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("yeah", 30.0, 30.4),
    ];
    let lines = match_lines(&words, "hello world");
    assert_eq!(texts(&lines), ["hello world", "yeah"]);
    assert_eq!((lines[0].start_s(), lines[0].end_s()), (0.0, 1.0));
}

#[test]
fn short_ad_lib_does_not_anchor_inside_a_longer_word() {
    let words = [
        w("hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("on", 1.2, 1.4),
        w("gone", 1.6, 2.0),
        w("away", 2.0, 2.4),
    ];
    let lines = match_lines(&words, "hello world\ngone away");
    assert_eq!(texts(&lines), ["hello world on", "gone away"]);
}

#[test]
fn containment_match_needs_agreeing_context() {
    let words = [
        w("hello", 0.0, 0.5),
        w("world", 0.5, 1.0),
        w("hey", 1.2, 1.4),
        w("they", 1.6, 2.0),
        w("said", 2.0, 2.4),
    ];
    let lines = match_lines(&words, "hello world\nthey said");
    assert_eq!(texts(&lines), ["hello world hey", "they said"]);

    // Clipped word whose neighbours continue the reference opens its line.
    let words = [
        w("keep", 0.0, 0.3),
        w("on", 0.3, 0.6),
        w("runnin", 0.8, 1.2),
        w("home", 1.2, 1.6),
    ];
    let lines = match_lines(&words, "keep on\nrunning home");
    assert_eq!(texts(&lines), ["keep on", "runnin home"]);
}
