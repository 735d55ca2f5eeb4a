use std::path::PathBuf;

use crate::config::EncoderSettings;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::LyrisyncResult;
use crate::render::surface::FrameRGBA;

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Codec, bitrate and bitrate-mode selection.
    pub encoder: EncoderSettings,
    /// Decoded track audio, muxed once under the video.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that mux audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Where a finished encode ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutput {
    /// Written incrementally to this file; nothing is held in memory.
    Streamed(PathBuf),
    /// The complete container, for the caller to save.
    Buffer(Vec<u8>),
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `push_frame` is called with strictly increasing indices between one `begin` and `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> LyrisyncResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LyrisyncResult<()>;
    /// Flush, finalize the container and hand back the result.
    fn end(&mut self) -> LyrisyncResult<SinkOutput>;
    /// Release resources after a failure or cancellation. The output is not usable afterwards.
    fn abort(&mut self) {}
}

/// Sink that keeps raw frames in memory; used by tests and debugging.
///
/// `end` returns the frames concatenated as one RGBA8 buffer.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Frames received so far.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> LyrisyncResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LyrisyncResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> LyrisyncResult<SinkOutput> {
        let mut out = Vec::with_capacity(self.frames.iter().map(|(_, f)| f.data.len()).sum());
        for (_, f) in &self.frames {
            out.extend_from_slice(&f.data);
        }
        Ok(SinkOutput::Buffer(out))
    }

    fn abort(&mut self) {
        self.frames.clear();
    }
}
