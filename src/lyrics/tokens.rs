//! Reference-lyric tokenization shared by the normalizer and the line matcher.

/// Tracks `[...]` and `{...}` nesting independently while scanning text.
///
/// Characters seen while either depth is above zero are annotation content and are dropped.
/// Stray closers never drive a depth negative.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct AnnotationStripper {
    square: u32,
    brace: u32,
}

impl AnnotationStripper {
    /// Strip annotation characters from `text`, carrying nesting state across calls.
    pub(crate) fn strip(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '[' => self.square += 1,
                ']' => self.square = self.square.saturating_sub(1),
                '{' => self.brace += 1,
                '}' => self.brace = self.brace.saturating_sub(1),
                _ if self.square == 0 && self.brace == 0 => out.push(ch),
                _ => {}
            }
        }
        out
    }
}

/// Remove bracketed and braced annotation runs (`[Chorus]`, `{spoken}`) from `text`.
pub fn strip_annotations(text: &str) -> String {
    AnnotationStripper::default().strip(text)
}

/// Canonical matching form: lower-cased, letters and digits only (Unicode-aware).
///
/// Pure punctuation canonicalizes to the empty string.
pub fn canonicalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One whitespace-delimited word of the reference lyrics, after tag stripping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptToken {
    /// Canonicalized text (never empty).
    pub normalized_text: String,
    /// Index of the non-empty reference line this token came from.
    pub line_index: usize,
    /// Whether this is the first token of its line.
    pub is_line_start: bool,
}

/// Tokenize reference lyrics into [`PromptToken`]s.
///
/// Lines that are empty after annotation stripping are skipped and do not consume a line
/// index. Tokens that canonicalize to nothing (a lone `-`) are skipped too; the first surviving
/// token of a line carries `is_line_start`.
pub fn prompt_tokens(reference_text: &str) -> Vec<PromptToken> {
    let stripped = strip_annotations(reference_text);
    let mut tokens = Vec::new();
    let mut line_index = 0usize;

    for line in stripped.lines() {
        let mut first = true;
        for raw in line.split_whitespace() {
            let normalized_text = canonicalize(raw);
            if normalized_text.is_empty() {
                continue;
            }
            tokens.push(PromptToken {
                normalized_text,
                line_index,
                is_line_start: first,
            });
            first = false;
        }
        if !first {
            line_index += 1;
        }
    }
    tokens
}

/// Common words that make poor anchors when resynchronizing after a run of misses.
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "ah", "all", "an", "and", "are", "at", "be", "but", "do", "for", "i", "im", "in", "is",
    "it", "its", "la", "me", "my", "na", "no", "oh", "on", "ooh", "so", "that", "the", "to", "we",
    "yeah", "you", "your",
];

pub(crate) fn is_stop_word(canonical: &str) -> bool {
    STOP_WORDS.binary_search(&canonical).is_ok()
}

#[cfg(test)]
#[path = "../../tests/unit/lyrics/tokens.rs"]
mod tests;
