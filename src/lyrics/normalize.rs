//! Cleanup of the raw aligned-word stream before line matching.
//!
//! Stage 1 drops annotation runs (`[Chorus]`, `{ad-lib}`), stage 2 glues split contractions
//! and stray punctuation back onto the words they belong to.

use crate::lyrics::tokens::AnnotationStripper;
use crate::lyrics::word::AlignedWord;

/// Largest silence (seconds) across which an opening punctuation run is glued onto the
/// following word. Wider gaps leave the opener as its own entry.
pub const OPENER_MERGE_GAP_S: f64 = 0.5;

const OPENERS: &[char] = &['(', '“', '‘', '¿', '¡', '«'];
const QUOTES: &[char] = &['"', '\''];
const APOSTROPHES: &[char] = &['\'', '’'];
const CONTRACTION_SUFFIXES: &[&str] = &["d", "ll", "m", "re", "s", "t", "ve"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fragment {
    /// Opening punctuation that belongs to the next word.
    Opener,
    /// Straight quote that may open or close depending on timing.
    Quote,
    /// Closing punctuation that belongs to the previous word.
    Closer,
    /// Contraction remainder (`'t`, `'s`, `n't`, or `t` after `don'`).
    Suffix,
    Word,
}

/// Normalize a raw aligned-word stream.
///
/// The result has non-decreasing `start_s`, `end_s >= start_s` per word, and no entry with
/// empty text. Word order is preserved.
#[tracing::instrument(level = "debug", skip(words), fields(n = words.len()))]
pub fn normalize_words(words: &[AlignedWord]) -> Vec<AlignedWord> {
    let stripped = strip_annotation_words(words);
    let merged = merge_fragments(stripped);
    tracing::debug!(out = merged.len(), "normalized aligned words");
    merged
}

/// Stage 1: remove annotation characters and drop words that end up empty.
///
/// Times are also clamped so that starts never go backwards and ends never precede starts.
fn strip_annotation_words(words: &[AlignedWord]) -> Vec<AlignedWord> {
    let mut stripper = AnnotationStripper::default();
    let mut out = Vec::with_capacity(words.len());
    let mut last_start = 0.0f64;

    for w in words {
        let text = stripper.strip(&w.word);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let start = if w.start_s.is_finite() {
            w.start_s.max(last_start)
        } else {
            last_start
        };
        let end = if w.end_s.is_finite() {
            w.end_s.max(start)
        } else {
            start
        };
        last_start = start;

        out.push(AlignedWord {
            word: text.to_owned(),
            start_s: start,
            end_s: end,
            success: w.success,
            confidence: w.confidence,
        });
    }
    out
}

/// Stage 2: merge punctuation and contraction fragments into their neighbours.
fn merge_fragments(words: Vec<AlignedWord>) -> Vec<AlignedWord> {
    let mut out: Vec<AlignedWord> = Vec::with_capacity(words.len());
    let mut pending_opener: Option<AlignedWord> = None;
    let mut iter = words.into_iter().peekable();

    while let Some(mut w) = iter.next() {
        if let Some(op) = pending_opener.take() {
            if has_alphanumeric(&w.word) && w.start_s - op.end_s < OPENER_MERGE_GAP_S {
                merge_forward(op, &mut w);
            } else {
                out.push(op);
            }
        }

        let kind = classify(&w.word, out.last());
        let kind = if kind == Fragment::Quote {
            let gap_prev = out.last().map(|p| w.start_s - p.end_s);
            let gap_next = iter.peek().map(|nx| nx.start_s - w.end_s);
            match (gap_prev, gap_next) {
                (Some(p), Some(nx)) if nx < p => Fragment::Opener,
                (Some(_), _) => Fragment::Closer,
                (None, _) => Fragment::Opener,
            }
        } else {
            kind
        };

        match kind {
            Fragment::Opener => pending_opener = Some(w),
            Fragment::Closer | Fragment::Suffix => match out.last_mut() {
                Some(prev) => merge_backward(prev, w),
                None => out.push(w),
            },
            Fragment::Word | Fragment::Quote => out.push(w),
        }
    }

    if let Some(op) = pending_opener {
        out.push(op);
    }
    out
}

fn classify(text: &str, prev: Option<&AlignedWord>) -> Fragment {
    if !has_alphanumeric(text) {
        if text.chars().all(|c| OPENERS.contains(&c)) {
            return Fragment::Opener;
        }
        if text.chars().all(|c| QUOTES.contains(&c)) {
            return Fragment::Quote;
        }
        if text
            .chars()
            .all(|c| OPENERS.contains(&c) || QUOTES.contains(&c))
        {
            return Fragment::Opener;
        }
        return Fragment::Closer;
    }

    let lower = text.to_lowercase();
    if let Some(rest) = lower.strip_prefix(APOSTROPHES)
        && CONTRACTION_SUFFIXES.contains(&rest)
    {
        return Fragment::Suffix;
    }
    if lower == "n't" || lower == "n’t" {
        return Fragment::Suffix;
    }
    if let Some(p) = prev
        && p.word.ends_with(APOSTROPHES)
        && CONTRACTION_SUFFIXES.contains(&lower.as_str())
    {
        return Fragment::Suffix;
    }
    Fragment::Word
}

fn has_alphanumeric(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

fn merge_backward(prev: &mut AlignedWord, frag: AlignedWord) {
    prev.word.push_str(&frag.word);
    prev.end_s = prev.end_s.max(frag.end_s);
    prev.success &= frag.success;
    prev.confidence = prev.confidence.min(frag.confidence);
}

fn merge_forward(opener: AlignedWord, next: &mut AlignedWord) {
    let mut text = opener.word;
    text.push_str(&next.word);
    next.word = text;
    next.start_s = opener.start_s.min(next.start_s);
    next.success &= opener.success;
    next.confidence = next.confidence.min(opener.confidence);
}

#[cfg(test)]
#[path = "../../tests/unit/lyrics/normalize.rs"]
mod tests;
