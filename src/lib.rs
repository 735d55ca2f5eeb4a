//! Lyrisync recovers display lines from word-level forced alignment, exports them as LRC/SRT
//! subtitles and renders scrolling lyric videos offline.
//!
//! - Recover [`Lines`] with [`match_lines`] (reference lyrics) or [`group_by_timing`]
//! - Export with [`to_lrc`] / [`to_srt`]
//! - Render a video with an [`OfflineRenderer`] streaming into a [`FrameSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Track audio decode and analysis.
pub mod audio;
/// Collaborator interfaces (alignment service, save prompt).
pub mod collab;
/// Render configuration.
pub mod config;
/// Frame sinks and the encode worker.
pub mod encode;
/// Shared primitives.
pub mod foundation;
/// Line recovery.
pub mod lyrics;
/// CPU frame rendering.
pub mod render;
/// Offline render and live preview sessions.
pub mod session;
/// LRC and SRT export.
pub mod subtitle;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8};
pub use crate::foundation::error::{LyrisyncError, LyrisyncResult};

pub use crate::audio::decode::{AudioPcm, AudioSource};
pub use crate::collab::{AlignmentSource, FixedSaveChoice, JsonAlignmentFile, SaveChoice, SavePrompt};
pub use crate::config::{RenderConfig, VisualSettings, VisualizerStyle};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, OutputTarget};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig, SinkOutput};
pub use crate::lyrics::matcher::{MatchTuning, match_lines};
pub use crate::lyrics::normalize::normalize_words;
pub use crate::lyrics::timing::group_by_timing;
pub use crate::lyrics::word::{AlignedWord, LineGroup, Lines};
pub use crate::render::background::Background;
pub use crate::render::frame::FrameRenderer;
pub use crate::render::lyrics::SmoothState;
pub use crate::render::surface::FrameRGBA;
pub use crate::session::preview::{LivePreview, PreviewHandoff};
pub use crate::session::render_session::{
    AudioInput, CancelToken, FfmpegSinkFactory, OfflineRenderer, RenderJob, RenderOutcome,
    RenderProgress, RenderStats, SinkFactory,
};
pub use crate::subtitle::lrc::{parse_lrc, to_lrc};
pub use crate::subtitle::srt::to_srt;
