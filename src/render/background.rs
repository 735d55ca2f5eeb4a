//! Frame backgrounds: solid color, still image, or a looping video.

use std::collections::{HashMap, VecDeque};
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::render::surface::{Surface, SurfaceImage};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff"];
const VIDEO_FRAME_CACHE: usize = 48;
const VIDEO_DECODE_BATCH: u64 = 24;

/// What is painted behind everything else.
#[derive(Debug)]
pub enum Background {
    /// Plain fill.
    Solid(Rgba8),
    /// Still image, scaled to cover the frame.
    Image(SurfaceImage),
    /// Video looped over the track, scaled to cover the frame.
    Video(LoopingVideo),
}

impl Background {
    /// Open an image or video file, picking the kind by extension.
    pub fn from_path(path: &Path, seek_timeout: Duration) -> LyrisyncResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read background '{}'", path.display()))?;
            return Ok(Self::Image(decode_image(&bytes)?));
        }
        let source = FfmpegVideoSource::probe(path)?;
        Ok(Self::Video(LoopingVideo::new(Box::new(source), seek_timeout)))
    }

    /// Paint the background for timeline time `t`.
    ///
    /// `fill` is always painted first so letterboxing and missing video frames stay opaque.
    pub fn draw(&mut self, surface: &mut Surface, t: f64, fill: Rgba8) -> LyrisyncResult<()> {
        let bounds = surface.bounds();
        match self {
            Self::Solid(c) => surface.fill_rect(bounds, *c),
            Self::Image(img) => {
                surface.fill_rect(bounds, fill);
                surface.fill_image(img, cover_rect(bounds, img.width, img.height));
            }
            Self::Video(video) => {
                surface.fill_rect(bounds, fill);
                if let Some(img) = video.frame_at(t)? {
                    surface.fill_image(&img, cover_rect(bounds, img.width, img.height));
                }
            }
        }
        Ok(())
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into a paint.
pub fn decode_image(bytes: &[u8]) -> LyrisyncResult<SurfaceImage> {
    let rgba = image::load_from_memory(bytes)
        .context("decode image from memory")?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    SurfaceImage::from_straight_rgba8(rgba.as_raw(), width, height)
}

/// Rectangle that covers `bounds` with a `w`x`h` image, centered, keeping aspect.
pub fn cover_rect(bounds: Rect, w: u32, h: u32) -> Rect {
    if w == 0 || h == 0 {
        return bounds;
    }
    let scale = (bounds.width() / f64::from(w)).max(bounds.height() / f64::from(h));
    let dw = f64::from(w) * scale;
    let dh = f64::from(h) * scale;
    let c = bounds.center();
    Rect::new(c.x - dw / 2.0, c.y - dh / 2.0, c.x + dw / 2.0, c.y + dh / 2.0)
}

/// Basic metadata about a background video.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Length of one loop in seconds.
    pub duration_s: f64,
    /// Source frame rate.
    pub fps: f64,
}

impl VideoInfo {
    /// Index of the last whole frame before the end of the loop.
    pub fn last_frame_index(&self) -> u64 {
        let n = self.duration_s * self.fps - 1.0;
        if n.is_finite() && n > 0.0 {
            n.floor() as u64
        } else {
            0
        }
    }

    /// RGBA8 byte length of one frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Sequential frame provider for [`LoopingVideo`].
pub trait VideoFrameSource: Send {
    /// Stream metadata.
    fn info(&self) -> &VideoInfo;

    /// Up to `count` straight-alpha RGBA8 frames starting at `t` seconds into the source.
    ///
    /// `Ok(None)` means the decode did not finish within `timeout`. Fewer frames than asked for
    /// (including none) is not an error; the end of the stream cuts batches short.
    fn frames_from(
        &mut self,
        t: f64,
        count: u32,
        timeout: Duration,
    ) -> LyrisyncResult<Option<Vec<Vec<u8>>>>;
}

/// Loops a video under the timeline: timeline `t` shows source time `t mod duration`.
///
/// Frames are decoded in batches and cached by source frame index. Every decode is awaited
/// before drawing, bounded by the seek timeout. A timed-out or empty decode reuses the previous
/// frame (or nothing before the first frame) and is logged.
pub struct LoopingVideo {
    source: Box<dyn VideoFrameSource>,
    timeout: Duration,
    last: Option<SurfaceImage>,
    cache: HashMap<u64, SurfaceImage>,
    lru: VecDeque<u64>,
    reused: u64,
}

impl std::fmt::Debug for LoopingVideo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopingVideo")
            .field("info", self.source.info())
            .field("timeout", &self.timeout)
            .field("reused", &self.reused)
            .finish()
    }
}

impl LoopingVideo {
    /// Wrap a frame source.
    pub fn new(source: Box<dyn VideoFrameSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            last: None,
            cache: HashMap::new(),
            lru: VecDeque::new(),
            reused: 0,
        }
    }

    /// Source time shown at timeline time `t`.
    pub fn loop_time(&self, t: f64) -> f64 {
        let d = self.source.info().duration_s;
        if !(d.is_finite() && d > 0.0) || !t.is_finite() {
            return 0.0;
        }
        t.rem_euclid(d)
    }

    /// Source frame shown at timeline time `t`, clamped to the last whole frame.
    pub fn frame_index(&self, t: f64) -> u64 {
        let info = self.source.info();
        let pos = self.loop_time(t) * info.fps;
        let index = if pos.is_finite() && pos > 0.0 {
            (pos + 1e-6).floor() as u64
        } else {
            0
        };
        index.min(info.last_frame_index())
    }

    /// Frames drawn from the previous frame because a decode timed out or came back empty.
    pub fn reused_frames(&self) -> u64 {
        self.reused
    }

    /// Frame to show at timeline time `t`.
    pub fn frame_at(&mut self, t: f64) -> LyrisyncResult<Option<SurfaceImage>> {
        let index = self.frame_index(t);
        if let Some(img) = self.cache.get(&index).cloned() {
            self.touch(index);
            self.last = Some(img.clone());
            return Ok(Some(img));
        }

        let info = self.source.info().clone();
        let count = (info.last_frame_index() - index + 1).min(VIDEO_DECODE_BATCH) as u32;
        let start = if info.fps > 0.0 {
            index as f64 / info.fps
        } else {
            0.0
        };
        let Some(frames) = self.source.frames_from(start, count, self.timeout)? else {
            return Ok(self.reuse_last(start, "background video decode timed out"));
        };
        for (k, rgba) in frames.iter().enumerate() {
            let img = SurfaceImage::from_straight_rgba8(rgba, info.width, info.height)?;
            self.insert(index + k as u64, img);
        }
        match self.cache.get(&index).cloned() {
            Some(img) => {
                self.last = Some(img.clone());
                Ok(Some(img))
            }
            None => Ok(self.reuse_last(start, "background video returned no frame")),
        }
    }

    fn reuse_last(&mut self, source_time: f64, reason: &str) -> Option<SurfaceImage> {
        self.reused += 1;
        tracing::warn!(
            source_time,
            timeout_ms = self.timeout.as_millis() as u64,
            "{reason}; reusing previous frame"
        );
        self.last.clone()
    }

    fn insert(&mut self, key: u64, image: SurfaceImage) {
        self.cache.insert(key, image);
        self.touch(key);
        while self.lru.len() > VIDEO_FRAME_CACHE {
            if let Some(old) = self.lru.pop_front() {
                self.cache.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

/// Frames decoded in batches with the system `ffmpeg`, probed with `ffprobe`.
#[derive(Debug)]
pub struct FfmpegVideoSource {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegVideoSource {
    /// Probe `path` for size, duration and frame rate.
    pub fn probe(path: &Path) -> LyrisyncResult<Self> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            avg_frame_rate: Option<String>,
            r_frame_rate: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| LyrisyncError::evaluation(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(LyrisyncError::evaluation(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| LyrisyncError::serde(format!("ffprobe json parse failed: {e}")))?;
        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| LyrisyncError::validation("background has no video stream"))?;
        let (Some(width), Some(height)) = (video.width, video.height) else {
            return Err(LyrisyncError::evaluation("missing video size from ffprobe"));
        };
        let fps = [&video.avg_frame_rate, &video.r_frame_rate]
            .into_iter()
            .find_map(|r| r.as_deref().and_then(parse_frame_rate))
            .ok_or_else(|| LyrisyncError::validation("background video has no usable frame rate"))?;
        let duration_s = parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| LyrisyncError::validation("background video has no usable duration"))?;

        Ok(Self {
            path: path.to_path_buf(),
            info: VideoInfo {
                width,
                height,
                duration_s,
                fps,
            },
        })
    }
}

/// Parse an ffprobe rate such as `30000/1001` or `25`; `0/0` and non-positive rates are `None`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.trim().split_once('/') {
        Some((num, den)) => num.trim().parse::<f64>().ok()? / den.trim().parse::<f64>().ok()?,
        None => s.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

impl VideoFrameSource for FfmpegVideoSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frames_from(
        &mut self,
        t: f64,
        count: u32,
        timeout: Duration,
    ) -> LyrisyncResult<Option<Vec<Vec<u8>>>> {
        let frame_len = self.info.frame_len();
        if count == 0 || frame_len == 0 {
            return Ok(Some(Vec::new()));
        }

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{t:.9}")])
            .arg("-i")
            .arg(&self.path)
            .args([
                "-frames:v",
                &count.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                LyrisyncError::evaluation(format!("failed to run ffmpeg for video decode: {e}"))
            })?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LyrisyncError::evaluation("failed to open ffmpeg stdout"))?;

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let res = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(res);
        });

        let bytes = match rx.recv_timeout(timeout) {
            Ok(res) => res.map_err(|e| {
                LyrisyncError::evaluation(format!("reading decoded video frames failed: {e}"))
            })?,
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
        };
        let status = child
            .wait()
            .map_err(|e| LyrisyncError::evaluation(format!("ffmpeg video decode failed: {e}")))?;
        if !status.success() && bytes.len() < frame_len {
            return Err(LyrisyncError::evaluation(format!(
                "ffmpeg video decode failed for '{}' ({status})",
                self.path.display()
            )));
        }

        Ok(Some(
            bytes
                .chunks_exact(frame_len)
                .take(count as usize)
                .map(<[u8]>::to_vec)
                .collect(),
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/background.rs"]
mod tests;
