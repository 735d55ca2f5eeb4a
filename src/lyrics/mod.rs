//! Line recovery from forced-alignment output.
//!
//! Raw aligned words are cleaned ([`normalize`]), then grouped into display lines either by
//! following reference lyrics ([`matcher`]) or, without a reference, by timing ([`timing`]).

/// Word-stream normalization (annotation stripping, fragment merging).
pub mod normalize;
/// Reference-guided line grouping.
pub mod matcher;
/// Timing-only line grouping.
pub mod timing;
/// Reference lyric tokenization.
pub mod tokens;
/// Aligned words and line groups.
pub mod word;
