use super::*;
use crate::collab::FixedSaveChoice;
use crate::config::VisualizerStyle;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Rgba8;
use crate::lyrics::word::AlignedWord;
use std::sync::atomic::AtomicUsize;

#[derive(Clone, Copy)]
enum Kind {
    Memory,
    /// Creates the output file on `begin`, fails at this frame if set.
    File(Option<u64>),
    /// Fails on `begin` without touching the output.
    NoEncoder,
}

struct MockFactory {
    kind: Kind,
    created: Arc<AtomicUsize>,
}

impl SinkFactory for MockFactory {
    fn create_sink(&mut self, target: &OutputTarget) -> LyrisyncResult<Box<dyn FrameSink>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(match (self.kind, target) {
            (Kind::File(fail_at), OutputTarget::File(path)) => Box::new(FileSink {
                path: path.clone(),
                fail_at,
            }),
            (Kind::NoEncoder, _) => Box::new(NoEncoderSink),
            _ => Box::new(InMemorySink::new()),
        })
    }
}

struct FileSink {
    path: PathBuf,
    fail_at: Option<u64>,
}

impl FrameSink for FileSink {
    fn begin(&mut self, _cfg: SinkConfig) -> LyrisyncResult<()> {
        std::fs::write(&self.path, b"partial").map_err(|e| LyrisyncError::encode(e.to_string()))
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &crate::FrameRGBA) -> LyrisyncResult<()> {
        if self.fail_at == Some(idx.0) {
            return Err(LyrisyncError::encode("disk full"));
        }
        Ok(())
    }

    fn end(&mut self) -> LyrisyncResult<SinkOutput> {
        Ok(SinkOutput::Streamed(self.path.clone()))
    }
}

struct NoEncoderSink;

impl FrameSink for NoEncoderSink {
    fn begin(&mut self, _cfg: SinkConfig) -> LyrisyncResult<()> {
        Err(LyrisyncError::encode("ffmpeg not found"))
    }

    fn push_frame(&mut self, _idx: FrameIndex, _frame: &crate::FrameRGBA) -> LyrisyncResult<()> {
        Ok(())
    }

    fn end(&mut self) -> LyrisyncResult<SinkOutput> {
        Ok(SinkOutput::Buffer(Vec::new()))
    }
}

fn config(style: VisualizerStyle) -> RenderConfig {
    let mut cfg = RenderConfig {
        width: 64,
        height: 36,
        fps: crate::Fps::new(10, 1).unwrap(),
        backpressure_ceiling: 2,
        progress_interval_frames: 2,
        ..RenderConfig::default()
    };
    cfg.visual.style = style;
    cfg.visual.font_size_px = 8.0;
    cfg
}

fn renderer(style: VisualizerStyle, kind: Kind) -> (OfflineRenderer, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let factory = MockFactory {
        kind,
        created: created.clone(),
    };
    (
        OfflineRenderer::new(config(style), Box::new(factory)).unwrap(),
        created,
    )
}

fn lines() -> Vec<LineGroup> {
    vec![
        LineGroup::new(vec![AlignedWord::new("hey", 0.0, 0.2)]).unwrap(),
        LineGroup::new(vec![AlignedWord::new("you", 0.3, 0.5)]).unwrap(),
    ]
}

fn job(lines: &[LineGroup], secs: f64) -> RenderJob<'_> {
    RenderJob {
        lines,
        audio: AudioInput::Pcm(AudioPcm::silence(8_000, 2, secs)),
        background: Background::Solid(Rgba8::rgb(0, 0, 0)),
    }
}

fn temp_out(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lyrisync_test_{}_{name}.mp4", std::process::id()))
}

#[test]
fn cancelled_prompt_allocates_nothing() {
    let (mut r, created) = renderer(VisualizerStyle::Bars, Kind::Memory);
    let lines = lines();
    let mut smooth = SmoothState::new();
    let out = r
        .render(
            job(&lines, 0.55),
            &mut FixedSaveChoice(SaveChoice::Cancelled),
            &mut smooth,
            &mut |_| {},
        )
        .unwrap();
    assert_eq!(out, RenderOutcome::Cancelled);
    assert_eq!(created.load(Ordering::SeqCst), 0);
}

#[test]
fn memory_render_submits_ceil_duration_times_fps_frames() {
    let (mut r, created) = renderer(VisualizerStyle::Bars, Kind::Memory);
    let lines = lines();
    let mut smooth = SmoothState::new();
    let mut seen = Vec::new();
    let out = r
        .render(
            job(&lines, 0.55),
            &mut FixedSaveChoice(SaveChoice::Memory),
            &mut smooth,
            &mut |p| seen.push(p.fraction()),
        )
        .unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let RenderOutcome::Completed { output, stats } = out else {
        panic!("expected completion");
    };
    assert_eq!(stats.frames_total, 6);
    assert_eq!(stats.frames_submitted, 6);
    assert!(stats.max_in_flight <= 2);
    let SinkOutput::Buffer(bytes) = output else {
        panic!("expected an in-memory buffer");
    };
    assert_eq!(bytes.len(), 6 * 64 * 36 * 4);
    assert_eq!(seen.last().copied(), Some(1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn empty_audio_is_a_decode_error_before_encoding() {
    let (mut r, created) = renderer(VisualizerStyle::None, Kind::Memory);
    let lines = lines();
    let mut smooth = SmoothState::new();
    let err = r
        .render(
            job(&lines, 0.0),
            &mut FixedSaveChoice(SaveChoice::Memory),
            &mut smooth,
            &mut |_| {},
        )
        .unwrap_err();
    assert!(matches!(err, LyrisyncError::Decode(_)));
    assert_eq!(created.load(Ordering::SeqCst), 0);
}

#[test]
fn cancel_mid_render_removes_partial_file() {
    let path = temp_out("cancel");
    let (mut r, _) = renderer(VisualizerStyle::None, Kind::File(None));
    let token = r.cancel_token();
    let lines = lines();
    let mut smooth = SmoothState::new();
    let out = r
        .render(
            job(&lines, 2.0),
            &mut FixedSaveChoice(SaveChoice::File(path.clone())),
            &mut smooth,
            &mut |_| token.cancel(),
        )
        .unwrap();
    assert_eq!(out, RenderOutcome::Cancelled);
    assert!(!path.exists());
}

#[test]
fn encoder_failure_is_an_error_and_removes_partial_file() {
    let path = temp_out("fail");
    let (mut r, _) = renderer(VisualizerStyle::None, Kind::File(Some(3)));
    let lines = lines();
    let mut smooth = SmoothState::new();
    let err = r
        .render(
            job(&lines, 1.0),
            &mut FixedSaveChoice(SaveChoice::File(path.clone())),
            &mut smooth,
            &mut |_| {},
        )
        .unwrap_err();
    assert!(matches!(&err, LyrisyncError::Encode(m) if m.contains("disk full")), "{err}");
    assert!(!path.exists());
}

#[test]
fn sink_that_never_starts_leaves_existing_file_alone() {
    let path = temp_out("existing");
    std::fs::write(&path, b"previous render").unwrap();
    let (mut r, _) = renderer(VisualizerStyle::None, Kind::NoEncoder);
    let lines = lines();
    let mut smooth = SmoothState::new();
    let err = r
        .render(
            job(&lines, 1.0),
            &mut FixedSaveChoice(SaveChoice::File(path.clone())),
            &mut smooth,
            &mut |_| {},
        )
        .unwrap_err();
    assert!(matches!(&err, LyrisyncError::Encode(m) if m.contains("ffmpeg not found")), "{err}");
    assert_eq!(std::fs::read(&path).unwrap(), b"previous render");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn temp_file_guard_removes_half_written_file() {
    let path = std::env::temp_dir()
        .join(format!("lyrisync_test_{}_guard.f32le", std::process::id()));
    {
        let _guard = TempFileGuard(path.clone());
        std::fs::write(&path, [0u8; 7]).unwrap();
    }
    assert!(!path.exists());
    // Nothing was ever written.
    drop(TempFileGuard(path.clone()));
    assert!(!path.exists());
}

#[test]
fn completed_file_render_is_kept() {
    let path = temp_out("ok");
    let (mut r, _) = renderer(VisualizerStyle::None, Kind::File(None));
    let lines = lines();
    let mut smooth = SmoothState::new();
    let out = r
        .render(
            job(&lines, 0.3),
            &mut FixedSaveChoice(SaveChoice::File(path.clone())),
            &mut smooth,
            &mut |_| {},
        )
        .unwrap();
    assert!(matches!(out, RenderOutcome::Completed { output: SinkOutput::Streamed(ref p), .. } if *p == path));
    assert!(path.exists());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn progress_fraction_handles_zero_total() {
    let p = RenderProgress { frame: 0, total: 0 };
    assert_eq!(p.fraction(), 1.0);
    let p = RenderProgress { frame: 3, total: 12 };
    assert_eq!(p.fraction(), 0.25);
}

#[test]
fn cancel_token_is_shared() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}
