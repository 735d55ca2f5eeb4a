//! Render configuration snapshot.
//!
//! A [`RenderConfig`] is created once when a render starts and never mutated while it runs. Every
//! field has a default, so a JSON file only needs the keys it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::analyser::{AnalyserOpts, AnalysisKind};
use crate::foundation::core::{Canvas, Fps, Rgba8};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// Immutable per-render settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Video/audio encoder choices.
    pub encoder: EncoderSettings,
    /// Look of the frame.
    pub visual: VisualSettings,
    /// Audio analyser parameters for the visualizer.
    pub analyser: AnalyserOpts,
    /// Frames allowed in flight to the encode worker before the renderer blocks.
    pub backpressure_ceiling: usize,
    /// Frames between progress callbacks.
    pub progress_interval_frames: u64,
    /// Longest wait for one background-video seek.
    pub seek_timeout_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: Fps::default(),
            encoder: EncoderSettings::default(),
            visual: VisualSettings::default(),
            analyser: AnalyserOpts::default(),
            backpressure_ceiling: 10,
            progress_interval_frames: 30,
            seek_timeout_ms: 2000,
        }
    }
}

impl RenderConfig {
    /// Load a JSON config and validate it.
    pub fn from_path(path: &Path) -> LyrisyncResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LyrisyncError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse a JSON config and validate it.
    pub fn from_json(text: &str) -> LyrisyncResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| LyrisyncError::serde(format!("render config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Reject values no render could honour.
    pub fn validate(&self) -> LyrisyncResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LyrisyncError::validation("width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(LyrisyncError::validation(
                "width/height must be even (required for yuv420p output)",
            ));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(LyrisyncError::validation("width/height must fit in u16"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.backpressure_ceiling == 0 {
            return Err(LyrisyncError::validation("backpressure_ceiling must be >= 1"));
        }
        if self.progress_interval_frames == 0 {
            return Err(LyrisyncError::validation(
                "progress_interval_frames must be >= 1",
            ));
        }
        self.encoder.validate()?;
        self.visual.validate()
    }
}

/// Video codec for the MP4 container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 via `libx264`.
    #[default]
    H264,
    /// VP9 via `libvpx-vp9`.
    Vp9,
}

/// Audio codec for the MP4 container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// AAC-LC.
    #[default]
    Aac,
    /// Opus via `libopus`.
    Opus,
}

/// Video rate control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateMode {
    /// Hold the target bitrate.
    Constant,
    /// Let the bitrate float around the target.
    #[default]
    Variable,
}

/// Encoder choices handed to the encode worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderSettings {
    /// Video codec.
    pub video_codec: VideoCodec,
    /// Target video bitrate.
    pub video_bitrate_kbps: u32,
    /// Rate control mode.
    pub bitrate_mode: BitrateMode,
    /// Audio codec.
    pub audio_codec: AudioCodec,
    /// Target audio bitrate.
    pub audio_bitrate_kbps: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            video_codec: VideoCodec::H264,
            video_bitrate_kbps: 8_000,
            bitrate_mode: BitrateMode::Variable,
            audio_codec: AudioCodec::Aac,
            audio_bitrate_kbps: 192,
        }
    }
}

impl EncoderSettings {
    fn validate(&self) -> LyrisyncResult<()> {
        if self.video_bitrate_kbps == 0 || self.audio_bitrate_kbps == 0 {
            return Err(LyrisyncError::validation("encoder bitrates must be non-zero"));
        }
        Ok(())
    }
}

/// Visualization drawn under the lyrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizerStyle {
    /// Lyrics only.
    None,
    /// Zero-crossing triggered oscilloscope.
    Wave,
    /// Frequency bars.
    #[default]
    Bars,
    /// Ring of radial bars pulsing with the bass.
    RadialRing,
    /// Closed Bézier contour pulsing with low frequencies.
    CircularWave,
}

impl VisualizerStyle {
    /// Analysis array the style draws from; `None` when nothing is drawn.
    pub fn analysis_kind(self) -> Option<AnalysisKind> {
        match self {
            Self::None => None,
            Self::Wave => Some(AnalysisKind::TimeDomain),
            Self::Bars | Self::RadialRing | Self::CircularWave => Some(AnalysisKind::Frequency),
        }
    }
}

/// Fonts, colors and motion of the frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualSettings {
    /// Visualizer style.
    pub style: VisualizerStyle,
    /// Draw the lyric layer.
    pub show_lyrics: bool,
    /// TTF/OTF used for lyrics. Without one, words are drawn as solid blocks.
    pub font_path: Option<PathBuf>,
    /// Lyric font size at the center slot.
    pub font_size_px: f32,
    /// Background fill.
    pub background_color: Rgba8,
    /// Word currently being sung.
    pub active_color: Rgba8,
    /// Words already sung in the active line.
    pub read_color: Rgba8,
    /// Words not yet reached in the active line.
    pub upcoming_color: Rgba8,
    /// Lines other than the active one.
    pub inactive_color: Rgba8,
    /// Visualizer paint.
    pub visualizer_color: Rgba8,
    /// Halo around the active word.
    pub glow: bool,
    /// Fraction of the remaining scroll distance covered per frame, `(0, 1]`.
    pub smoothing: f64,
    /// Shift of the lyric block from the vertical center.
    pub vertical_offset_px: f32,
    /// Visualizer gain.
    pub sensitivity: f32,
    /// Bars for `bars` and `radial_ring`.
    pub bar_count: usize,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            style: VisualizerStyle::Bars,
            show_lyrics: true,
            font_path: None,
            font_size_px: 56.0,
            background_color: Rgba8::rgb(0x0b, 0x0b, 0x12),
            active_color: Rgba8::rgb(0xff, 0xff, 0xff),
            read_color: Rgba8::rgb(0xc8, 0xc8, 0xd8),
            upcoming_color: Rgba8::rgb(0x6e, 0x6e, 0x85),
            inactive_color: Rgba8::rgb(0x9a, 0x9a, 0xb0),
            visualizer_color: Rgba8::rgb(0x7c, 0x5c, 0xff),
            glow: true,
            smoothing: 0.15,
            vertical_offset_px: 0.0,
            sensitivity: 1.0,
            bar_count: 64,
        }
    }
}

impl VisualSettings {
    fn validate(&self) -> LyrisyncResult<()> {
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(LyrisyncError::validation(
                "font_size_px must be finite and > 0",
            ));
        }
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(LyrisyncError::validation("smoothing must be in (0, 1]"));
        }
        if !self.vertical_offset_px.is_finite() {
            return Err(LyrisyncError::validation("vertical_offset_px must be finite"));
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(LyrisyncError::validation(
                "sensitivity must be finite and >= 0",
            ));
        }
        if !(1..=512).contains(&self.bar_count) {
            return Err(LyrisyncError::validation("bar_count must be in 1..=512"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
