//! Offline and live audio analysis with browser analyser-node semantics.
//!
//! Byte frequency data is the smoothed, Blackman-windowed FFT magnitude mapped from
//! `[min_decibels, max_decibels]` onto `0..=255`. Byte time-domain data maps `[-1, 1]` onto
//! `0..=255` with 128 as silence.

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio::decode::AudioPcm;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// Which sample array a visualizer consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// `fft_size` waveform bytes.
    TimeDomain,
    /// `fft_size / 2` spectrum bytes.
    Frequency,
}

/// One captured analysis array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisFrame {
    /// Kind of data in `data`.
    pub kind: AnalysisKind,
    /// Byte samples.
    pub data: Vec<u8>,
}

impl AnalysisFrame {
    /// The array an analyser reports for digital silence.
    pub fn silent(kind: AnalysisKind, fft_size: usize) -> Self {
        let data = match kind {
            AnalysisKind::TimeDomain => vec![128; fft_size],
            AnalysisKind::Frequency => vec![0; fft_size / 2],
        };
        Self { kind, data }
    }
}

/// Analyser parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyserOpts {
    /// FFT window length; a power of two in `32..=32768`.
    pub fft_size: usize,
    /// Spectral smoothing across captures, `[0, 1)`.
    pub smoothing_time_constant: f32,
    /// Level mapped to byte 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255.
    pub max_decibels: f32,
}

impl Default for AnalyserOpts {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// FFT analyser over a mono sample history.
pub struct Analyser {
    opts: AnalyserOpts,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser").field("opts", &self.opts).finish()
    }
}

impl Analyser {
    /// Build an analyser, validating `opts`.
    pub fn new(opts: AnalyserOpts) -> LyrisyncResult<Self> {
        let n = opts.fft_size;
        if !n.is_power_of_two() || !(32..=32768).contains(&n) {
            return Err(LyrisyncError::validation(format!(
                "fft_size must be a power of two in 32..=32768, got {n}"
            )));
        }
        if !(0.0..1.0).contains(&opts.smoothing_time_constant) {
            return Err(LyrisyncError::validation(
                "smoothing_time_constant must be in [0, 1)",
            ));
        }
        if opts.min_decibels >= opts.max_decibels {
            return Err(LyrisyncError::validation(
                "min_decibels must be below max_decibels",
            ));
        }

        let fft = FftPlanner::new().plan_fft_forward(n);
        Ok(Self {
            opts,
            fft,
            window: blackman(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
        })
    }

    /// FFT window length.
    pub fn fft_size(&self) -> usize {
        self.opts.fft_size
    }

    /// Number of frequency bins (`fft_size / 2`).
    pub fn frequency_bin_count(&self) -> usize {
        self.opts.fft_size / 2
    }

    /// Forget smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Capture `kind` data from the newest `fft_size` samples of `history`.
    ///
    /// Shorter histories are zero-padded at the front. Frequency captures update the smoothing
    /// state, time-domain captures do not.
    pub fn capture(&mut self, kind: AnalysisKind, history: &[f32]) -> AnalysisFrame {
        let n = self.opts.fft_size;
        let tail = &history[history.len().saturating_sub(n)..];
        let pad = n - tail.len();

        let data = match kind {
            AnalysisKind::TimeDomain => {
                let mut out = vec![128u8; n];
                for (o, &s) in out[pad..].iter_mut().zip(tail) {
                    *o = (128.0 * (f64::from(s) + 1.0)).floor().clamp(0.0, 255.0) as u8;
                }
                out
            }
            AnalysisKind::Frequency => self.byte_frequency(tail, pad),
        };
        AnalysisFrame { kind, data }
    }

    fn byte_frequency(&mut self, tail: &[f32], pad: usize) -> Vec<u8> {
        let n = self.opts.fft_size;
        for c in &mut self.buffer[..pad] {
            *c = Complex::new(0.0, 0.0);
        }
        for (i, &s) in tail.iter().enumerate() {
            self.buffer[pad + i] = Complex::new(s * self.window[pad + i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.opts.smoothing_time_constant;
        let range = self.opts.max_decibels - self.opts.min_decibels;
        let scale = 1.0 / n as f32;
        let mut out = Vec::with_capacity(n / 2);
        for (k, sm) in self.smoothed.iter_mut().enumerate() {
            let mag = self.buffer[k].norm() * scale;
            *sm = tau * *sm + (1.0 - tau) * mag;
            let db = if *sm > 0.0 {
                20.0 * sm.log10()
            } else {
                f32::NEG_INFINITY
            };
            let byte = (255.0 / range * (db - self.opts.min_decibels)).floor();
            out.push(if byte.is_finite() {
                byte.clamp(0.0, 255.0) as u8
            } else {
                0
            });
        }
        out
    }
}

fn blackman(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42f64, 0.5f64, 0.08f64);
    (0..n)
        .map(|i| {
            let x = std::f64::consts::TAU * i as f64 / n as f64;
            (a0 - a1 * x.cos() + a2 * (2.0 * x).cos()) as f32
        })
        .collect()
}

/// Deterministic frame-synchronized analysis over a fully decoded track.
///
/// Models an offline audio graph suspended at every frame tick: frame `i` captures analysis at
/// sample `round(i / fps * sample_rate)`, then the graph resumes toward the next tick. Smoothing
/// carries across ticks exactly as in a realtime graph.
#[derive(Debug)]
pub struct OfflineAnalysis {
    mono: Vec<f32>,
    sample_rate: u32,
    fps: Fps,
    kind: AnalysisKind,
    analyser: Analyser,
    next: u64,
    total: u64,
}

impl OfflineAnalysis {
    /// Prepare the analysis pass for `pcm` at `fps`.
    #[tracing::instrument(level = "debug", skip(pcm, opts), fields(secs = pcm.duration_s()))]
    pub fn new(
        pcm: &AudioPcm,
        fps: Fps,
        kind: AnalysisKind,
        opts: AnalyserOpts,
    ) -> LyrisyncResult<Self> {
        if pcm.sample_rate == 0 {
            return Err(LyrisyncError::validation("audio sample_rate must be non-zero"));
        }
        let total = fps.secs_to_frames_ceil(pcm.duration_s());
        Ok(Self {
            mono: pcm.to_mono(),
            sample_rate: pcm.sample_rate,
            fps,
            kind,
            analyser: Analyser::new(opts)?,
            next: 0,
            total,
        })
    }

    /// Number of frame ticks: `ceil(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.total
    }

    /// Sample position the graph is suspended at for `frame`.
    pub fn sample_for_frame(&self, frame: FrameIndex) -> usize {
        let t = self.fps.frames_to_secs(frame.0);
        let s = (t * f64::from(self.sample_rate)).round() as usize;
        s.min(self.mono.len())
    }

    /// Advance to the next tick and capture its analysis.
    pub fn next_frame(&mut self) -> Option<(FrameIndex, AnalysisFrame)> {
        if self.next >= self.total {
            return None;
        }
        let idx = FrameIndex(self.next);
        let end = self.sample_for_frame(idx);
        let frame = self.analyser.capture(self.kind, &self.mono[..end]);
        self.next += 1;
        Some((idx, frame))
    }
}

impl Iterator for OfflineAnalysis {
    type Item = (FrameIndex, AnalysisFrame);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

/// Analyser bound to one track for live preview.
///
/// Created when a track is attached with the visualizer enabled; dropped with the track.
#[derive(Debug)]
pub struct LiveAnalyser {
    mono: Arc<[f32]>,
    sample_rate: u32,
    kind: AnalysisKind,
    analyser: Analyser,
}

impl LiveAnalyser {
    /// Bind an analyser to decoded track audio.
    pub fn new(pcm: &AudioPcm, kind: AnalysisKind, opts: AnalyserOpts) -> LyrisyncResult<Self> {
        if pcm.sample_rate == 0 {
            return Err(LyrisyncError::validation("audio sample_rate must be non-zero"));
        }
        Ok(Self {
            mono: pcm.to_mono().into(),
            sample_rate: pcm.sample_rate,
            kind,
            analyser: Analyser::new(opts)?,
        })
    }

    /// Capture analysis at playback position `time_s`.
    pub fn sample_at(&mut self, time_s: f64) -> AnalysisFrame {
        let end = if time_s.is_finite() && time_s > 0.0 {
            ((time_s * f64::from(self.sample_rate)).round() as usize).min(self.mono.len())
        } else {
            0
        };
        self.analyser.capture(self.kind, &self.mono[..end])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/analyser.rs"]
mod tests;
