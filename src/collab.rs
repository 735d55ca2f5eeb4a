//! Interfaces to collaborators outside this crate: the alignment service and the save prompt.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::lyrics::word::AlignedWord;

/// Source of forced-alignment results for a track.
pub trait AlignmentSource {
    /// Aligned words for `track_id`, in time order.
    fn fetch_alignment(
        &mut self,
        track_id: &str,
        credentials: Option<&str>,
    ) -> LyrisyncResult<Vec<AlignedWord>>;
}

/// Alignment results saved as JSON, either the service response or a bare word array.
#[derive(Clone, Debug)]
pub struct JsonAlignmentFile {
    path: PathBuf,
}

impl JsonAlignmentFile {
    /// Read from `path`; the track id and credentials are ignored.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlignmentSource for JsonAlignmentFile {
    fn fetch_alignment(
        &mut self,
        _track_id: &str,
        _credentials: Option<&str>,
    ) -> LyrisyncResult<Vec<AlignedWord>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            LyrisyncError::validation(format!(
                "failed to read alignment '{}': {e}",
                self.path.display()
            ))
        })?;
        parse_alignment_json(&text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AlignmentDoc {
    Response { aligned_words: Vec<AlignedWord> },
    Words(Vec<AlignedWord>),
}

/// Parse an alignment response (`{"aligned_words": [...]}`) or a bare array of words.
pub fn parse_alignment_json(text: &str) -> LyrisyncResult<Vec<AlignedWord>> {
    let doc: AlignmentDoc = serde_json::from_str(text)
        .map_err(|e| LyrisyncError::serde(format!("alignment json: {e}")))?;
    Ok(match doc {
        AlignmentDoc::Response { aligned_words } => aligned_words,
        AlignmentDoc::Words(words) => words,
    })
}

/// Answer of the save-file prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveChoice {
    /// Stream the video to this file.
    File(PathBuf),
    /// No file handle available; keep the whole video in memory.
    Memory,
    /// The user declined; nothing is rendered.
    Cancelled,
}

/// Asks where an offline render should go. Called before any encoder resources exist.
pub trait SavePrompt {
    /// Ask once; `suggested_name` is a file name hint.
    fn choose(&mut self, suggested_name: &str) -> SaveChoice;
}

/// Non-interactive prompt that always gives the same answer.
#[derive(Clone, Debug)]
pub struct FixedSaveChoice(pub SaveChoice);

impl SavePrompt for FixedSaveChoice {
    fn choose(&mut self, _suggested_name: &str) -> SaveChoice {
        self.0.clone()
    }
}
