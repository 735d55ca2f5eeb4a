use super::*;
use crate::config::EncoderSettings;
use crate::foundation::core::Fps;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Log {
    events: Vec<String>,
}

/// Sink that records calls and can be slowed down or made to fail.
struct ScriptedSink {
    log: Arc<Mutex<Log>>,
    delay: Duration,
    fail_at: Option<u64>,
    fail_begin: bool,
}

impl FrameSink for ScriptedSink {
    fn begin(&mut self, _cfg: SinkConfig) -> LyrisyncResult<()> {
        self.log.lock().unwrap().events.push("begin".into());
        if self.fail_begin {
            return Err(LyrisyncError::encode("ffmpeg not found"));
        }
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> LyrisyncResult<()> {
        std::thread::sleep(self.delay);
        if self.fail_at == Some(idx.0) {
            return Err(LyrisyncError::encode("encoder exploded"));
        }
        self.log.lock().unwrap().events.push(format!("frame {}", idx.0));
        Ok(())
    }

    fn end(&mut self) -> LyrisyncResult<SinkOutput> {
        self.log.lock().unwrap().events.push("end".into());
        Ok(SinkOutput::Buffer(vec![1, 2, 3]))
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().events.push("abort".into());
    }
}

fn sink(delay_ms: u64, fail_at: Option<u64>) -> (Box<dyn FrameSink>, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let s = ScriptedSink {
        log: log.clone(),
        delay: Duration::from_millis(delay_ms),
        fail_at,
        fail_begin: false,
    };
    (Box::new(s), log)
}

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::default(),
        encoder: EncoderSettings::default(),
        audio: None,
    }
}

fn frame() -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 16],
    }
}

#[test]
fn frames_are_encoded_in_order_and_finalized() {
    let (s, log) = sink(0, None);
    let mut w = EncodeWorker::spawn(s, 4).unwrap();
    w.init(cfg()).unwrap();
    for i in 0..10 {
        w.submit(FrameIndex(i), frame()).unwrap();
    }
    assert_eq!(w.submitted(), 10);
    let out = w.finalize().unwrap();
    assert_eq!(out, SinkOutput::Buffer(vec![1, 2, 3]));

    let events = log.lock().unwrap().events.clone();
    assert_eq!(events.first().map(String::as_str), Some("begin"));
    assert_eq!(events.last().map(String::as_str), Some("end"));
    let frames: Vec<_> = events.iter().filter(|e| e.starts_with("frame")).collect();
    assert_eq!(frames.len(), 10);
    assert_eq!(frames[3], "frame 3");
}

#[test]
fn in_flight_never_exceeds_ceiling() {
    let (s, _log) = sink(2, None);
    let mut w = EncodeWorker::spawn(s, 3).unwrap();
    w.init(cfg()).unwrap();
    for i in 0..20 {
        w.submit(FrameIndex(i), frame()).unwrap();
        assert!(w.in_flight() <= 3);
    }
    assert!(w.max_in_flight() <= 3);
    assert!(w.max_in_flight() >= 1);
    w.finalize().unwrap();
}

#[test]
fn worker_error_surfaces_and_aborts_sink() {
    let (s, log) = sink(0, Some(2));
    let mut w = EncodeWorker::spawn(s, 2).unwrap();
    w.init(cfg()).unwrap();
    let mut failed = None;
    for i in 0..50 {
        if let Err(e) = w.submit(FrameIndex(i), frame()) {
            failed = Some(e);
            break;
        }
    }
    let err = match failed {
        Some(e) => e,
        None => w.finalize().unwrap_err(),
    };
    assert!(matches!(&err, LyrisyncError::Encode(m) if m.contains("exploded")), "{err}");
    assert!(log.lock().unwrap().events.contains(&"abort".to_owned()));
}

#[test]
fn terminate_aborts_started_sink() {
    let (s, log) = sink(0, None);
    let mut w = EncodeWorker::spawn(s, 2).unwrap();
    w.init(cfg()).unwrap();
    w.submit(FrameIndex(0), frame()).unwrap();
    w.terminate();
    let events = log.lock().unwrap().events.clone();
    assert_eq!(events.last().map(String::as_str), Some("abort"));
    assert!(!events.contains(&"end".to_owned()));
}

#[test]
fn unused_worker_never_touches_sink() {
    let (s, log) = sink(0, None);
    let w = EncodeWorker::spawn(s, 2).unwrap();
    w.terminate();
    assert!(log.lock().unwrap().events.is_empty());
}

#[test]
fn init_waits_for_the_sink_to_start() {
    let log = Arc::new(Mutex::new(Log::default()));
    let s = ScriptedSink {
        log: log.clone(),
        delay: Duration::ZERO,
        fail_at: None,
        fail_begin: true,
    };
    let mut w = EncodeWorker::spawn(Box::new(s), 2).unwrap();
    let err = w.init(cfg()).unwrap_err();
    assert!(matches!(&err, LyrisyncError::Encode(m) if m.contains("ffmpeg not found")), "{err}");
    assert!(w.submit(FrameIndex(0), frame()).is_err());
    w.terminate();
    assert_eq!(log.lock().unwrap().events, vec!["begin".to_owned(), "abort".to_owned()]);
}
