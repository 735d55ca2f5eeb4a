use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// Sample rate every source is resampled to during decode.
pub const DECODE_SAMPLE_RATE: u32 = 48_000;

/// Where the track audio comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    /// Local media file.
    Path(PathBuf),
    /// Remote source fetched by `ffmpeg` (`http://`, `https://`).
    Url(String),
}

impl AudioSource {
    /// Interpret a CLI/config string as a URL when it has an http(s) scheme, else as a path.
    pub fn parse(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(s.to_owned())
        } else {
            Self::Path(PathBuf::from(s))
        }
    }

    fn as_ffmpeg_input(&self) -> OsString {
        match self {
            Self::Path(p) => p.as_os_str().to_owned(),
            Self::Url(u) => OsString::from(u),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Url(u) => u.clone(),
        }
    }
}

/// Decoded interleaved floating-point PCM, held fully in memory for the render.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Digital silence of the given length.
    pub fn silence(sample_rate: u32, channels: u16, secs: f64) -> Self {
        let frames = (secs.max(0.0) * f64::from(sample_rate)).round() as usize;
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Track length in seconds.
    pub fn duration_s(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Down-mix to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        let ch = usize::from(self.channels.max(1));
        self.interleaved_f32
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }

    /// Write the samples as raw `f32le` for use as an `ffmpeg` input.
    pub fn write_f32le_file(&self, out_path: &Path) -> LyrisyncResult<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LyrisyncError::encode(format!(
                    "failed to create audio directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let mut bytes = Vec::<u8>::with_capacity(self.interleaved_f32.len() * 4);
        for &sample in &self.interleaved_f32 {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(out_path, bytes).map_err(|e| {
            LyrisyncError::encode(format!(
                "failed to write audio file '{}': {e}",
                out_path.display()
            ))
        })
    }
}

/// Decode (and for URLs, fetch) a whole source to stereo interleaved `f32` PCM.
///
/// A source without any audio samples is a decode failure: the render has nothing to sync to.
#[tracing::instrument(skip(source), fields(source = %source.describe()))]
pub fn decode_audio_f32_stereo(source: &AudioSource, sample_rate: u32) -> LyrisyncResult<AudioPcm> {
    if sample_rate == 0 {
        return Err(LyrisyncError::validation("decode sample_rate must be non-zero"));
    }

    let out = std::process::Command::new("ffmpeg")
        .args(decode_args(source, sample_rate))
        .output()
        .map_err(|e| LyrisyncError::decode(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(LyrisyncError::decode(format!(
            "ffmpeg audio decode failed for '{}': {}",
            source.describe(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let pcm = pcm_from_f32le(&out.stdout, sample_rate, 2)?;
    if pcm.interleaved_f32.is_empty() {
        return Err(LyrisyncError::decode(format!(
            "'{}' contains no audio samples",
            source.describe()
        )));
    }
    tracing::debug!(frames = pcm.frames(), secs = pcm.duration_s(), "decoded audio");
    Ok(pcm)
}

fn decode_args(source: &AudioSource, sample_rate: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-i"].map(OsString::from).into();
    args.push(source.as_ffmpeg_input());
    args.extend(
        [
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ]
        .map(OsString::from),
    );
    args
}

fn pcm_from_f32le(bytes: &[u8], sample_rate: u32, channels: u16) -> LyrisyncResult<AudioPcm> {
    if !bytes.len().is_multiple_of(4) {
        return Err(LyrisyncError::decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let interleaved_f32 = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
