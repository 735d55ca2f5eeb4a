use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::analyser::OfflineAnalysis;
use crate::audio::decode::{AudioPcm, AudioSource, DECODE_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::collab::{SaveChoice, SavePrompt};
use crate::config::RenderConfig;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, OutputTarget};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig, SinkOutput};
use crate::encode::worker::EncodeWorker;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::lyrics::word::LineGroup;
use crate::render::background::Background;
use crate::render::frame::FrameRenderer;
use crate::render::lyrics::SmoothState;

const SUGGESTED_FILE_NAME: &str = "lyric-video.mp4";

/// Creates the sink the encode worker will own.
///
/// Only called after the save prompt was answered and the audio decoded.
pub trait SinkFactory {
    /// Build a sink writing to `target`.
    fn create_sink(&mut self, target: &OutputTarget) -> LyrisyncResult<Box<dyn FrameSink>>;
}

/// Factory for [`FfmpegSink`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegSinkFactory;

impl SinkFactory for FfmpegSinkFactory {
    fn create_sink(&mut self, target: &OutputTarget) -> LyrisyncResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::new(FfmpegSinkOpts::new(target.clone()))))
    }
}

/// Track audio for a render.
#[derive(Clone, Debug)]
pub enum AudioInput {
    /// Fetch and decode with `ffmpeg`.
    Source(AudioSource),
    /// Already decoded.
    Pcm(AudioPcm),
}

/// Inputs of one offline render.
#[derive(Debug)]
pub struct RenderJob<'a> {
    /// Lines to show.
    pub lines: &'a [LineGroup],
    /// Track audio; sets the video length.
    pub audio: AudioInput,
    /// Frame background.
    pub background: Background,
}

/// Shared flag checked once per frame.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// New, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fractional completion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderProgress {
    /// Frames submitted.
    pub frame: u64,
    /// Frames in the video.
    pub total: u64,
}

impl RenderProgress {
    /// `frame / total` in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.frame as f64 / self.total as f64
        }
    }
}

/// Counters of a finished render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// `ceil(duration * fps)`.
    pub frames_total: u64,
    /// Frames handed to the encode worker.
    pub frames_submitted: u64,
    /// Highest number of unconfirmed frames at any time.
    pub max_in_flight: usize,
}

/// How a render ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The video is complete.
    Completed {
        /// Streamed file or in-memory container.
        output: SinkOutput,
        /// Counters.
        stats: RenderStats,
    },
    /// The user cancelled; nothing was kept.
    Cancelled,
}

/// Offline lyric-video renderer.
///
/// Ordering: save prompt, decode, analysis, encoder start, per-frame render with
/// backpressure, finalize. Cancelling at the prompt allocates nothing.
pub struct OfflineRenderer {
    config: RenderConfig,
    factory: Box<dyn SinkFactory>,
    cancel: CancelToken,
}

impl std::fmt::Debug for OfflineRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineRenderer")
            .field("config", &self.config)
            .finish()
    }
}

impl OfflineRenderer {
    /// Validate `config` and keep `factory` for encoder construction.
    pub fn new(config: RenderConfig, factory: Box<dyn SinkFactory>) -> LyrisyncResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            cancel: CancelToken::new(),
        })
    }

    /// Token that cancels the current or next render.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Configuration in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Run one render.
    ///
    /// `smooth` is advanced frame by frame; pass the state obtained from a
    /// [`PreviewHandoff`](crate::session::preview::PreviewHandoff) when a preview is live.
    /// `progress` is called every `progress_interval_frames` frames and once at the end.
    #[tracing::instrument(skip_all, fields(lines = job.lines.len()))]
    pub fn render(
        &mut self,
        job: RenderJob<'_>,
        prompt: &mut dyn SavePrompt,
        smooth: &mut SmoothState,
        progress: &mut dyn FnMut(RenderProgress),
    ) -> LyrisyncResult<RenderOutcome> {
        let target = match prompt.choose(SUGGESTED_FILE_NAME) {
            SaveChoice::Cancelled => {
                tracing::info!("render cancelled at save prompt");
                return Ok(RenderOutcome::Cancelled);
            }
            SaveChoice::File(path) => OutputTarget::File(path),
            SaveChoice::Memory => OutputTarget::Memory,
        };
        if self.cancel.is_cancelled() {
            return Ok(RenderOutcome::Cancelled);
        }

        let pcm = match job.audio {
            AudioInput::Source(src) => decode_audio_f32_stereo(&src, DECODE_SAMPLE_RATE)?,
            AudioInput::Pcm(pcm) => pcm,
        };
        if pcm.frames() == 0 || pcm.sample_rate == 0 {
            return Err(LyrisyncError::decode("audio has no samples"));
        }
        let fps = self.config.fps;
        let frames_total = fps.secs_to_frames_ceil(pcm.duration_s());

        let analysis = match self.config.visual.style.analysis_kind() {
            Some(kind) => Some(OfflineAnalysis::new(
                &pcm,
                fps,
                kind,
                self.config.analyser,
            )?),
            None => None,
        };
        let renderer = FrameRenderer::new(
            self.config.canvas(),
            self.config.visual.clone(),
            job.background,
        )?;

        let audio_path = temp_audio_path();
        let _audio_tmp = TempFileGuard(audio_path.clone());
        pcm.write_f32le_file(&audio_path)?;
        let sink_cfg = SinkConfig {
            width: self.config.width,
            height: self.config.height,
            fps,
            encoder: self.config.encoder,
            audio: Some(AudioInputConfig {
                path: audio_path,
                sample_rate: pcm.sample_rate,
                channels: pcm.channels,
            }),
        };
        drop(pcm);

        let sink = self.factory.create_sink(&target)?;
        let mut worker = EncodeWorker::spawn(sink, self.config.backpressure_ceiling)?;
        if let Err(e) = worker.init(sink_cfg) {
            worker.terminate();
            return Err(e);
        }
        // The sink has opened the output; from here a failed render leaves nothing behind.
        let mut partial = PartialOutput(match &target {
            OutputTarget::File(path) => Some(path.clone()),
            OutputTarget::Memory => None,
        });
        tracing::debug!(frames_total, "encode worker started");

        let mut run = FrameLoop {
            renderer,
            analysis,
            lines: job.lines,
            fps,
            frames_total,
            progress_every: self.config.progress_interval_frames.max(1),
            cancel: &self.cancel,
        };
        let finished = run.drive(&mut worker, smooth, progress);

        let stats = RenderStats {
            frames_total,
            frames_submitted: worker.submitted(),
            max_in_flight: worker.max_in_flight(),
        };
        match finished {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(frames = stats.frames_submitted, "render cancelled");
                worker.terminate();
                return Ok(RenderOutcome::Cancelled);
            }
            Err(e) => {
                worker.terminate();
                return Err(e);
            }
        }

        let output = worker.finalize()?;
        partial.keep();
        progress(RenderProgress {
            frame: frames_total,
            total: frames_total,
        });
        tracing::debug!(?stats, "render complete");
        Ok(RenderOutcome::Completed { output, stats })
    }
}

struct FrameLoop<'a> {
    renderer: FrameRenderer,
    analysis: Option<OfflineAnalysis>,
    lines: &'a [LineGroup],
    fps: Fps,
    frames_total: u64,
    progress_every: u64,
    cancel: &'a CancelToken,
}

impl FrameLoop<'_> {
    /// `Ok(false)` when cancelled.
    fn drive(
        &mut self,
        worker: &mut EncodeWorker,
        smooth: &mut SmoothState,
        progress: &mut dyn FnMut(RenderProgress),
    ) -> LyrisyncResult<bool> {
        for i in 0..self.frames_total {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            let t = self.fps.frames_to_secs(i);
            let analysis = self
                .analysis
                .as_mut()
                .and_then(|a| a.next_frame())
                .map(|(_, frame)| frame);
            let frame = self
                .renderer
                .render_frame(t, self.lines, smooth, analysis.as_ref())?;
            worker.submit(FrameIndex(i), frame)?;

            let done = i + 1;
            if done % self.progress_every == 0 && done < self.frames_total {
                progress(RenderProgress {
                    frame: done,
                    total: self.frames_total,
                });
            }
        }
        Ok(true)
    }
}

fn temp_audio_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "lyrisync_audio_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}

/// Removes a scratch file, including one left half-written.
struct TempFileGuard(PathBuf);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Deletes a streamed output file unless the render completed.
struct PartialOutput(Option<PathBuf>);

impl PartialOutput {
    fn keep(&mut self) {
        self.0 = None;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        let Some(path) = self.0.take() else {
            return;
        };
        if !path.exists() {
            return;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove partial output"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
