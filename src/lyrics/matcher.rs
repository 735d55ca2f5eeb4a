//! Recovers line structure by aligning the aligned-word stream with reference lyrics.
//!
//! The matcher walks the words once while a token pointer advances monotonically through the
//! reference tokens. Each matched token tells us which reference line the word belongs to, and
//! a jump to a later line closes the current group. Unmatched words stay in the group they were
//! sung in. After several misses in a row the search window widens ("lost" state) so the
//! pointer can resynchronize past filler the reference text never had.

use crate::lyrics::normalize::normalize_words;
use crate::lyrics::timing::group_by_timing;
use crate::lyrics::tokens::{PromptToken, canonicalize, is_stop_word, prompt_tokens};
use crate::lyrics::word::{AlignedWord, LineBuilder, Lines};

/// Tunables for [`match_lines_with`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchTuning {
    /// Consecutive misses after which the matcher is "lost".
    pub lost_after: u32,
    /// Token lookahead window in the normal state.
    pub lookahead: usize,
    /// Token lookahead window while lost.
    pub lost_lookahead: usize,
    /// Exact matches this close to the pointer are taken without context scoring.
    pub exact_fast_path: usize,
    /// While lost, candidates further than this from the pointer must start a line.
    pub line_start_required_beyond: usize,
    /// An unmatched word sung this long after the current group's last word closes the group.
    pub gap_break_s: f64,
    /// Shorter side of a containment match must have at least this many chars. Containment
    /// matches are only taken when the following words agree with the reference.
    pub min_partial_len: usize,
    /// How many words an unmatched opener may look ahead for its line.
    pub opener_lookahead: usize,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            lost_after: 3,
            lookahead: 50,
            lost_lookahead: 500,
            exact_fast_path: 3,
            line_start_required_beyond: 20,
            gap_break_s: 2.0,
            min_partial_len: 3,
            opener_lookahead: 3,
        }
    }
}

/// Normalize `words` and group them into lines following `reference_text`.
///
/// Falls back to [`group_by_timing`] when the reference yields no tokens. Empty `words` give
/// empty `Lines`.
pub fn match_lines(words: &[AlignedWord], reference_text: &str) -> Lines {
    match_lines_with(words, reference_text, MatchTuning::default())
}

/// [`match_lines`] with explicit tunables.
#[tracing::instrument(level = "debug", skip(words, reference_text), fields(words = words.len()))]
pub fn match_lines_with(words: &[AlignedWord], reference_text: &str, tuning: MatchTuning) -> Lines {
    let words = normalize_words(words);
    let tokens = prompt_tokens(reference_text);
    if tokens.is_empty() {
        tracing::debug!("no reference tokens; grouping by timing");
        return group_by_timing(&words);
    }

    let canon: Vec<String> = words.iter().map(|w| canonicalize(&w.word)).collect();
    let mut m = Matcher {
        words: &words,
        canon: &canon,
        tokens: &tokens,
        tuning,
        ptr: 0,
        line: None,
        misses: 0,
        builder: LineBuilder::default(),
    };
    for wi in 0..words.len() {
        m.step(wi);
    }
    let lines = m.builder.finish();
    tracing::debug!(lines = lines.len(), tokens = tokens.len(), "matched lines");
    lines
}

struct Matcher<'a> {
    words: &'a [AlignedWord],
    canon: &'a [String],
    tokens: &'a [PromptToken],
    tuning: MatchTuning,
    /// Next reference token that may still be matched.
    ptr: usize,
    /// Reference line of the group being built.
    line: Option<usize>,
    misses: u32,
    builder: LineBuilder,
}

impl Matcher<'_> {
    fn is_lost(&self) -> bool {
        self.misses >= self.tuning.lost_after
    }

    fn step(&mut self, wi: usize) {
        let word = &self.words[wi];

        if self.canon[wi].is_empty() {
            if let Some(next_line) = self.opener_target_line(wi) {
                self.builder.break_line();
                self.line = Some(next_line);
            }
            self.builder.push_word(word.clone());
            return;
        }

        match self.find_candidate(wi) {
            Some(ti) => {
                let tok_line = self.tokens[ti].line_index;
                match self.line {
                    Some(cur) if tok_line > cur => {
                        self.builder.break_line();
                        self.line = Some(tok_line);
                    }
                    None => self.line = Some(tok_line),
                    Some(_) => {}
                }
                self.ptr = ti + 1;
                self.misses = 0;
            }
            None => {
                self.misses += 1;
                if let Some(prev) = self.builder.current().last()
                    && word.start_s - prev.end_s > self.tuning.gap_break_s
                {
                    self.builder.break_line();
                }
            }
        }

        self.builder.push_word(word.clone());
    }

    /// Find the token index matching word `wi`, searching forward from the pointer.
    fn find_candidate(&self, wi: usize) -> Option<usize> {
        let text = self.canon[wi].as_str();
        let lost = self.is_lost();
        let window = if lost {
            self.tuning.lost_lookahead
        } else {
            self.tuning.lookahead
        };
        let end = self.ptr.saturating_add(window).min(self.tokens.len());

        let mut first_exact = None;

        for ti in self.ptr..end {
            let tok = &self.tokens[ti];
            let cand = tok.normalized_text.as_str();
            let exact = cand == text;

            if lost {
                if !exact || is_stop_word(cand) {
                    continue;
                }
                if ti - self.ptr > self.tuning.line_start_required_beyond && !tok.is_line_start {
                    continue;
                }
                return Some(ti);
            }

            if !exact && !self.partial_match(cand, text) {
                continue;
            }
            if exact && ti - self.ptr < self.tuning.exact_fast_path {
                return Some(ti);
            }
            if self.context_score(wi, ti) > 0 {
                return Some(ti);
            }
            if exact {
                first_exact.get_or_insert(ti);
            }
        }

        first_exact
    }

    fn partial_match(&self, a: &str, b: &str) -> bool {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        short.chars().count() >= self.tuning.min_partial_len && long.contains(short)
    }

    /// How many of the next (up to two) sung words continue the reference after token `ti`.
    fn context_score(&self, wi: usize, ti: usize) -> u32 {
        let next_words = self.canon[wi + 1..]
            .iter()
            .filter(|c| !c.is_empty())
            .take(2);
        let mut score = 0;
        for (k, next) in next_words.enumerate() {
            let Some(tok) = self.tokens.get(ti + 1 + k) else {
                break;
            };
            let t = tok.normalized_text.as_str();
            if t == next || self.partial_match(t, next) {
                score += 1;
            } else {
                break;
            }
        }
        score
    }

    /// An unmatched opening mark (`(`, `"`) sung nearer to the next word than to the previous
    /// one, where the next word starts a later reference line, opens that line instead.
    /// Returns the line it opens.
    fn opener_target_line(&self, wi: usize) -> Option<usize> {
        let word = &self.words[wi];
        if !word.word.starts_with(['(', '"', '“', '\'', '‘', '¿', '¡', '«']) {
            return None;
        }
        let (Some(cur_line), Some(prev)) = (self.line, self.builder.current().last()) else {
            return None;
        };
        let Some(next_wi) = (wi + 1..self.words.len())
            .take(self.tuning.opener_lookahead)
            .find(|&j| !self.canon[j].is_empty())
        else {
            return None;
        };

        let gap_prev = word.start_s - prev.end_s;
        let gap_next = self.words[next_wi].start_s - word.end_s;
        if gap_next >= gap_prev {
            return None;
        }

        let end = self
            .ptr
            .saturating_add(self.tuning.lookahead)
            .min(self.tokens.len());
        self.tokens[self.ptr..end]
            .iter()
            .find(|t| t.normalized_text == self.canon[next_wi])
            .map(|t| t.line_index)
            .filter(|&line| line > cur_line)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/lyrics/matcher.rs"]
mod tests;
