use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::config::{AudioCodec, BitrateMode, EncoderSettings, VideoCodec};
use crate::encode::sink::{FrameSink, SinkConfig, SinkOutput};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::surface::FrameRGBA;

/// Where the encoded container goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// Stream to a file as frames arrive.
    File(PathBuf),
    /// Collect a fragmented MP4 in memory.
    Memory,
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output destination.
    pub target: OutputTarget,
    /// Overwrite an existing output file.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Options for `target` with overwrite enabled and a black background.
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// Audio is optional and provided through `SinkConfig.audio`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    stdout_collect: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a sink; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            stdout_collect: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> LyrisyncResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(LyrisyncError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(LyrisyncError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(LyrisyncError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if let Some(audio) = cfg.audio.as_ref()
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(LyrisyncError::validation(
                "audio sample_rate and channels must be non-zero when audio is enabled",
            ));
        }

        if let OutputTarget::File(path) = &self.opts.target {
            ensure_parent_dir(path)?;
            if !self.opts.overwrite && path.exists() {
                return Err(LyrisyncError::validation(format!(
                    "output file '{}' already exists",
                    path.display()
                )));
            }
        }

        if !is_ffmpeg_on_path() {
            return Err(LyrisyncError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let memory = self.opts.target == OutputTarget::Memory;
        let mut cmd = Command::new("ffmpeg");
        cmd.args(encode_args(&cfg, &self.opts.target, self.opts.overwrite))
            .stdin(Stdio::piped())
            .stdout(if memory { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::piped());

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            codec = ?cfg.encoder.video_codec,
            memory,
            "spawning ffmpeg encoder"
        );
        let mut child = cmd.spawn().map_err(|e| {
            LyrisyncError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LyrisyncError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LyrisyncError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        self.stderr_drain = Some(std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        }));
        if memory {
            let mut stdout = child.stdout.take().ok_or_else(|| {
                LyrisyncError::encode("failed to open ffmpeg stdout (unexpected)")
            })?;
            self.stdout_collect = Some(std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stdout.read_to_end(&mut bytes)?;
                Ok(bytes)
            }));
        }

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> LyrisyncResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| LyrisyncError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(LyrisyncError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(LyrisyncError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(LyrisyncError::encode("ffmpeg sink is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            LyrisyncError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn end(&mut self) -> LyrisyncResult<SinkOutput> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| LyrisyncError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            LyrisyncError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = join_reader(self.stderr_drain.take(), "stderr")?;
        let stdout_bytes = join_reader(self.stdout_collect.take(), "stdout")?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(LyrisyncError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(match &self.opts.target {
            OutputTarget::File(path) => SinkOutput::Streamed(path.clone()),
            OutputTarget::Memory => SinkOutput::Buffer(stdout_bytes),
        })
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = join_reader(self.stderr_drain.take(), "stderr");
        let _ = join_reader(self.stdout_collect.take(), "stdout");
        self.cfg = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn join_reader(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    what: &str,
) -> LyrisyncResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| LyrisyncError::encode(format!("ffmpeg {what} reader thread panicked")))?
            .map_err(|e| LyrisyncError::encode(format!("ffmpeg {what} read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

/// Full `ffmpeg` argument list for an encode.
pub(crate) fn encode_args(cfg: &SinkConfig, target: &OutputTarget, overwrite: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    args.extend(os_args([if overwrite { "-y" } else { "-n" }]));
    // Input: raw RGBA8, already flattened to opaque in push_frame.
    args.extend(os_args([
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
    ]));
    args.extend(os_args(input_fps_args(cfg.fps)));
    args.extend(os_args(["-i", "pipe:0"]));

    if let Some(audio) = cfg.audio.as_ref() {
        args.extend(os_args([
            "-f",
            "f32le",
            "-ar",
            &audio.sample_rate.to_string(),
            "-ac",
            &audio.channels.to_string(),
            "-i",
        ]));
        args.push(audio.path.clone().into_os_string());
    }

    args.extend(os_args(video_codec_args(&cfg.encoder)));
    if cfg.audio.is_some() {
        args.extend(os_args(audio_codec_args(&cfg.encoder)));
        args.extend(os_args(["-shortest"]));
    } else {
        args.extend(os_args(["-an"]));
    }

    match target {
        OutputTarget::File(path) => {
            args.extend(os_args(["-movflags", "+faststart"]));
            args.push(path.clone().into_os_string());
        }
        OutputTarget::Memory => {
            // A non-seekable pipe needs a fragmented MP4.
            args.extend(os_args([
                "-movflags",
                "frag_keyframe+empty_moov",
                "-f",
                "mp4",
                "pipe:1",
            ]));
        }
    }
    args
}

fn os_args<S: AsRef<OsStr>>(xs: impl IntoIterator<Item = S>) -> impl Iterator<Item = OsString> {
    xs.into_iter().map(|s| s.as_ref().to_os_string())
}

fn input_fps_args(fps: Fps) -> [String; 2] {
    // For rawvideo input, `-r` before `-i` sets the input framerate as `num/den`.
    ["-r".to_owned(), format!("{}/{}", fps.num, fps.den)]
}

fn video_codec_args(enc: &EncoderSettings) -> Vec<String> {
    let codec = match enc.video_codec {
        VideoCodec::H264 => "libx264",
        VideoCodec::Vp9 => "libvpx-vp9",
    };
    let rate = format!("{}k", enc.video_bitrate_kbps);
    let mut out = vec![
        "-c:v".to_owned(),
        codec.to_owned(),
        "-pix_fmt".to_owned(),
        "yuv420p".to_owned(),
        "-b:v".to_owned(),
        rate.clone(),
    ];
    if enc.bitrate_mode == BitrateMode::Constant {
        out.extend([
            "-minrate".to_owned(),
            rate.clone(),
            "-maxrate".to_owned(),
            rate,
            "-bufsize".to_owned(),
            format!("{}k", enc.video_bitrate_kbps.saturating_mul(2)),
        ]);
    }
    out
}

fn audio_codec_args(enc: &EncoderSettings) -> Vec<String> {
    let codec = match enc.audio_codec {
        AudioCodec::Aac => "aac",
        AudioCodec::Opus => "libopus",
    };
    vec![
        "-c:a".to_owned(),
        codec.to_owned(),
        "-b:a".to_owned(),
        format!("{}k", enc.audio_bitrate_kbps),
    ]
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> LyrisyncResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(LyrisyncError::validation(
            "frame.data size mismatch with width*height*4",
        ));
    }

    let [bg_r, bg_g, bg_b, _] = bg_rgba.map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> LyrisyncResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
