use serde::{Deserialize, Serialize};

/// One word with timestamps, as returned by the forced-alignment service.
///
/// Immutable once received. `start_s <= end_s`; a stream of words is delivered in
/// non-decreasing time order but may carry annotation fragments such as `[Chorus]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignedWord {
    /// Raw token text.
    pub word: String,
    /// Start time in seconds.
    #[serde(alias = "startS", alias = "start")]
    pub start_s: f64,
    /// End time in seconds.
    #[serde(alias = "endS", alias = "end")]
    pub end_s: f64,
    /// Whether the aligner reported a confident alignment.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Alignment confidence in `[0, 1]`.
    #[serde(default, alias = "p_align", alias = "palign")]
    pub confidence: f64,
}

fn default_success() -> bool {
    true
}

impl AlignedWord {
    /// Build a successfully aligned word with full confidence.
    pub fn new(word: impl Into<String>, start_s: f64, end_s: f64) -> Self {
        Self {
            word: word.into(),
            start_s,
            end_s,
            success: true,
            confidence: 1.0,
        }
    }

    /// Word duration in seconds (never negative).
    pub fn duration_s(&self) -> f64 {
        (self.end_s - self.start_s).max(0.0)
    }

    /// Return `true` when `time` lies inside `[start_s, end_s]`.
    pub fn contains_time(&self, time: f64) -> bool {
        self.start_s <= time && time <= self.end_s
    }
}

/// A contiguous, non-empty run of aligned words shown as one line.
///
/// Words are in non-decreasing time order; the effective span is
/// `[first.start_s, last.end_s]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AlignedWord>", into = "Vec<AlignedWord>")]
pub struct LineGroup {
    words: Vec<AlignedWord>,
}

/// All line groups of a track, rebuilt wholesale on every re-alignment.
pub type Lines = Vec<LineGroup>;

impl LineGroup {
    /// Build a group; returns `None` for an empty word list.
    pub fn new(words: Vec<AlignedWord>) -> Option<Self> {
        if words.is_empty() {
            None
        } else {
            Some(Self { words })
        }
    }

    /// Borrow the words of this line.
    pub fn words(&self) -> &[AlignedWord] {
        &self.words
    }

    /// First word (groups are never empty).
    pub fn first(&self) -> &AlignedWord {
        &self.words[0]
    }

    /// Last word (groups are never empty).
    pub fn last(&self) -> &AlignedWord {
        &self.words[self.words.len() - 1]
    }

    /// Start of the line's span in seconds.
    pub fn start_s(&self) -> f64 {
        self.first().start_s
    }

    /// End of the line's span in seconds.
    pub fn end_s(&self) -> f64 {
        self.last().end_s
    }

    /// Return `true` when `time` lies inside the line's span.
    pub fn contains_time(&self, time: f64) -> bool {
        self.start_s() <= time && time <= self.end_s()
    }

    /// Display text: words joined by single spaces.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, w) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(w.word.trim());
        }
        out
    }

    /// Number of words in the line.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl TryFrom<Vec<AlignedWord>> for LineGroup {
    type Error = String;

    fn try_from(words: Vec<AlignedWord>) -> Result<Self, Self::Error> {
        Self::new(words).ok_or_else(|| "a line group must contain at least one word".to_owned())
    }
}

impl From<LineGroup> for Vec<AlignedWord> {
    fn from(line: LineGroup) -> Self {
        line.words
    }
}

/// Accumulates words into line groups, skipping empty flushes.
#[derive(Debug, Default)]
pub(crate) struct LineBuilder {
    lines: Lines,
    current: Vec<AlignedWord>,
}

impl LineBuilder {
    pub(crate) fn push_word(&mut self, word: AlignedWord) {
        self.current.push(word);
    }

    pub(crate) fn current(&self) -> &[AlignedWord] {
        &self.current
    }

    /// Close the current group if it has any words.
    pub(crate) fn break_line(&mut self) {
        if let Some(line) = LineGroup::new(std::mem::take(&mut self.current)) {
            self.lines.push(line);
        }
    }

    pub(crate) fn finish(mut self) -> Lines {
        self.break_line();
        self.lines
    }
}
