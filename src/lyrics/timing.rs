use crate::lyrics::word::{AlignedWord, LineBuilder, Lines};

/// Thresholds for [`group_by_timing`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingTuning {
    /// A silence longer than this always starts a new line.
    pub silence_break_s: f64,
    /// Accumulated characters after which a line may break on a short pause.
    pub max_line_chars: usize,
    /// Pause that is enough to break a long line or a finished clause.
    pub soft_break_s: f64,
}

impl Default for TimingTuning {
    fn default() -> Self {
        Self {
            silence_break_s: 0.5,
            max_line_chars: 40,
            soft_break_s: 0.15,
        }
    }
}

/// Group words into subtitle-style lines purely from timing and punctuation.
///
/// Used when no reference lyrics are available.
pub fn group_by_timing(words: &[AlignedWord]) -> Lines {
    group_by_timing_with(words, TimingTuning::default())
}

/// [`group_by_timing`] with explicit thresholds.
pub fn group_by_timing_with(words: &[AlignedWord], tuning: TimingTuning) -> Lines {
    let mut builder = LineBuilder::default();
    let mut line_chars = 0usize;

    for w in words {
        if let Some(prev) = builder.current().last() {
            let gap = w.start_s - prev.end_s;
            let long_line = line_chars > tuning.max_line_chars;
            let clause_done = ends_clause(&prev.word);
            if gap > tuning.silence_break_s || ((long_line || clause_done) && gap > tuning.soft_break_s)
            {
                builder.break_line();
                line_chars = 0;
            }
        }

        if !builder.current().is_empty() {
            line_chars += 1;
        }
        line_chars += w.word.chars().count();
        builder.push_word(w.clone());
    }

    builder.finish()
}

fn ends_clause(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', '”', '’'])
        .ends_with(['.', '!', '?', ';', '…'])
}
