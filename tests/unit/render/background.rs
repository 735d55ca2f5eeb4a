use super::*;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

const FAKE_FPS: f64 = 30.0;

type RequestLog = Arc<Mutex<Vec<(f64, u32)>>>;

/// Uniform frames whose gray level is the source frame index.
struct FakeSource {
    info: VideoInfo,
    /// `true` entries time out.
    script: VecDeque<bool>,
    /// Batches starting at or after this time decode nothing.
    empty_from: f64,
    requests: RequestLog,
}

impl FakeSource {
    fn new(duration_s: f64, script: &[bool]) -> (Self, RequestLog) {
        let requests = RequestLog::default();
        let source = Self {
            info: VideoInfo {
                width: 2,
                height: 2,
                duration_s,
                fps: FAKE_FPS,
            },
            script: script.iter().copied().collect(),
            empty_from: f64::INFINITY,
            requests: Arc::clone(&requests),
        };
        (source, requests)
    }
}

impl VideoFrameSource for FakeSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn frames_from(
        &mut self,
        t: f64,
        count: u32,
        _timeout: Duration,
    ) -> LyrisyncResult<Option<Vec<Vec<u8>>>> {
        self.requests.lock().unwrap().push((t, count));
        if self.script.pop_front().unwrap_or(false) {
            return Ok(None);
        }
        if t >= self.empty_from {
            return Ok(Some(Vec::new()));
        }
        let first = (t * FAKE_FPS).round() as u64;
        Ok(Some(
            (0..u64::from(count))
                .map(|k| {
                    let v = (first + k) as u8;
                    [v, v, v, 255].repeat(4)
                })
                .collect(),
        ))
    }
}

fn video(source: FakeSource) -> LoopingVideo {
    LoopingVideo::new(Box::new(source), Duration::from_millis(10))
}

/// Gray level drawn at timeline time `t`.
fn shade(bg: &mut Background, t: f64) -> u8 {
    let mut s = Surface::new(2, 2).unwrap();
    s.begin_frame();
    bg.draw(&mut s, t, Rgba8::rgb(0, 0, 0)).unwrap();
    s.snapshot().pixel(0, 0)[0]
}

#[test]
fn loop_time_wraps_the_timeline() {
    let video = video(FakeSource::new(2.0, &[]).0);
    assert_eq!(video.loop_time(0.5), 0.5);
    assert!((video.loop_time(4.25) - 0.25).abs() < 1e-12);
    assert_eq!(video.loop_time(f64::NAN), 0.0);
}

#[test]
fn frame_index_clamps_to_last_whole_frame() {
    let v = video(FakeSource::new(5.0, &[]).0);
    assert_eq!(v.frame_index(4.983), 149);
    assert_eq!(v.frame_index(4.9999), 149);
    assert_eq!(v.frame_index(5.5), 15);

    // Container ends a little after the last frame's timestamp.
    let v = video(FakeSource::new(5.01, &[]).0);
    assert_eq!(v.frame_index(5.005), 149);
}

#[test]
fn timed_out_decode_reuses_previous_frame() {
    let mut v = video(FakeSource::new(2.0, &[true, false, true]).0);
    assert!(v.frame_at(0.0).unwrap().is_none());
    let first = v.frame_at(0.5).unwrap().unwrap();
    // Index 57 lies outside the batch decoded for 0.5s.
    let reused = v.frame_at(1.9).unwrap().unwrap();
    assert_eq!(first.width, reused.width);
    assert_eq!(v.reused_frames(), 2);
}

#[test]
fn empty_decode_near_loop_end_reuses_previous_frame() {
    let (mut source, _) = FakeSource::new(5.0, &[]);
    source.empty_from = 4.95;
    let mut bg = Background::Video(video(source));

    assert_eq!(shade(&mut bg, 4.0), 120);
    assert_eq!(shade(&mut bg, 4.983), 120);
    // The next loop carries on normally.
    assert_eq!(shade(&mut bg, 5.5), 15);

    let Background::Video(v) = &bg else {
        unreachable!()
    };
    assert_eq!(v.reused_frames(), 1);
}

#[test]
fn batches_fill_the_cache() {
    let (source, requests) = FakeSource::new(2.0, &[]);
    let mut bg = Background::Video(video(source));

    assert_eq!(shade(&mut bg, 0.0), 0);
    assert_eq!(shade(&mut bg, 0.4), 12);
    assert_eq!(shade(&mut bg, 2.1), 3);
    assert_eq!(requests.lock().unwrap().len(), 1);

    assert_eq!(shade(&mut bg, 1.0), 30);
    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], (0.0, 24));
    assert!((requests[1].0 - 1.0).abs() < 1e-9);
}

#[test]
fn batch_stops_at_loop_end() {
    let (source, requests) = FakeSource::new(1.0, &[]);
    let mut v = video(source);
    v.frame_at(0.9).unwrap().unwrap();
    assert_eq!(requests.lock().unwrap()[0].1, 3);
}

#[test]
fn frame_rates_parse_from_ffprobe_strings() {
    assert_eq!(parse_frame_rate("30/1"), Some(30.0));
    assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
    assert_eq!(parse_frame_rate("25"), Some(25.0));
    assert_eq!(parse_frame_rate("0/0"), None);
    assert_eq!(parse_frame_rate("abc"), None);
}

#[test]
fn cover_rect_fills_and_centers() {
    let bounds = Rect::new(0.0, 0.0, 200.0, 100.0);
    let r = cover_rect(bounds, 100, 100);
    assert_eq!(r, Rect::new(0.0, -50.0, 200.0, 150.0));
    assert_eq!(cover_rect(bounds, 0, 10), bounds);
}

#[test]
fn image_background_decodes_png() {
    let img = image::RgbaImage::from_raw(1, 1, vec![255, 0, 0, 255]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    let decoded = decode_image(&buf).unwrap();
    assert_eq!((decoded.width, decoded.height), (1, 1));

    let mut bg = Background::Image(decoded);
    let mut s = Surface::new(4, 2).unwrap();
    s.begin_frame();
    bg.draw(&mut s, 0.0, Rgba8::rgb(0, 0, 0)).unwrap();
    assert_eq!(s.snapshot().pixel(3, 1), [255, 0, 0, 255]);
}

#[test]
fn missing_background_is_an_error() {
    let err = Background::from_path(Path::new("/nonexistent/bg.png"), Duration::from_secs(1));
    assert!(err.is_err());
}
