//! Live preview: one frame per display tick, driven by the playback clock.

use std::ops::{Deref, DerefMut};

use crate::audio::analyser::{AnalyserOpts, LiveAnalyser};
use crate::audio::decode::AudioPcm;
use crate::foundation::error::LyrisyncResult;
use crate::lyrics::word::{LineGroup, Lines};
use crate::render::frame::FrameRenderer;
use crate::render::lyrics::SmoothState;
use crate::render::surface::FrameRGBA;

/// Current position of the audio being played.
pub trait PlaybackClock {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
}

impl PlaybackClock for f64 {
    fn current_time(&self) -> f64 {
        *self
    }
}

/// Live preview state: lines, scroll position and the track's analyser.
///
/// [`LivePreview::tick`] never blocks. An offline render borrows the scroll state through
/// [`LivePreview::handoff`], which pauses ticking until the handoff is dropped.
#[derive(Debug)]
pub struct LivePreview {
    renderer: FrameRenderer,
    lines: Lines,
    smooth: SmoothState,
    analyser: Option<LiveAnalyser>,
    running: bool,
}

impl LivePreview {
    /// Preview drawing through `renderer`; stopped, with no lines and no track.
    pub fn new(renderer: FrameRenderer) -> Self {
        Self {
            renderer,
            lines: Vec::new(),
            smooth: SmoothState::new(),
            analyser: None,
            running: false,
        }
    }

    /// Replace the lines after a re-alignment.
    pub fn set_lines(&mut self, lines: Lines) {
        self.lines = lines;
    }

    /// Lines being shown.
    pub fn lines(&self) -> &[LineGroup] {
        &self.lines
    }

    /// Bind a new track. The analyser only exists while the visualizer needs one.
    pub fn attach_track(&mut self, pcm: &AudioPcm, opts: AnalyserOpts) -> LyrisyncResult<()> {
        self.analyser = match self.renderer.visual().style.analysis_kind() {
            Some(kind) => Some(LiveAnalyser::new(pcm, kind, opts)?),
            None => None,
        };
        self.smooth.reset();
        Ok(())
    }

    /// Drop the track's analyser and rewind the scroll.
    pub fn detach_track(&mut self) {
        self.analyser = None;
        self.smooth.reset();
    }

    /// Whether a track analyser is live.
    pub fn has_analyser(&self) -> bool {
        self.analyser.is_some()
    }

    /// Start ticking.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop ticking.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether ticks draw.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current scroll state.
    pub fn smooth(&self) -> SmoothState {
        self.smooth
    }

    /// Draw one frame at the clock's time; `None` while stopped.
    pub fn tick(&mut self, clock: &dyn PlaybackClock) -> LyrisyncResult<Option<FrameRGBA>> {
        if !self.running {
            return Ok(None);
        }
        let t = clock.current_time();
        let analysis = self.analyser.as_mut().map(|a| a.sample_at(t));
        let frame =
            self.renderer
                .render_frame(t, &self.lines, &mut self.smooth, analysis.as_ref())?;
        Ok(Some(frame))
    }

    /// Stop the loop and lend the scroll state to an offline render.
    pub fn handoff(&mut self) -> PreviewHandoff<'_> {
        let was_running = self.running;
        self.running = false;
        let saved = self.smooth;
        self.smooth.reset();
        PreviewHandoff {
            preview: self,
            saved,
            was_running,
        }
    }
}

/// Exclusive loan of the preview's scroll state.
///
/// Created stopped and reset to line 0; on drop the saved scroll position is restored and the
/// loop resumes if it was running.
#[derive(Debug)]
pub struct PreviewHandoff<'a> {
    preview: &'a mut LivePreview,
    saved: SmoothState,
    was_running: bool,
}

impl PreviewHandoff<'_> {
    /// Lines of the preview, for the render job.
    pub fn lines(&self) -> &[LineGroup] {
        &self.preview.lines
    }

    /// Split into the lines and the loaned scroll state.
    pub fn parts(&mut self) -> (&[LineGroup], &mut SmoothState) {
        (&self.preview.lines, &mut self.preview.smooth)
    }
}

impl Deref for PreviewHandoff<'_> {
    type Target = SmoothState;

    fn deref(&self) -> &SmoothState {
        &self.preview.smooth
    }
}

impl DerefMut for PreviewHandoff<'_> {
    fn deref_mut(&mut self) -> &mut SmoothState {
        &mut self.preview.smooth
    }
}

impl Drop for PreviewHandoff<'_> {
    fn drop(&mut self) {
        self.preview.smooth = self.saved;
        self.preview.running = self.was_running;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/preview.rs"]
mod tests;
