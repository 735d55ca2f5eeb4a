use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use crate::encode::sink::{FrameSink, SinkConfig, SinkOutput};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::render::surface::FrameRGBA;

/// Messages from the render loop to the encode worker.
#[derive(Debug)]
pub enum WorkerRequest {
    /// Configure the encoders and open the container.
    Init(SinkConfig),
    /// Encode one frame.
    EncodeFrame {
        /// Timeline index.
        index: FrameIndex,
        /// Rendered pixels, moved to the worker.
        frame: FrameRGBA,
    },
    /// Flush encoders and finalize the container.
    Finalize,
}

/// Messages from the encode worker back to the render loop.
#[derive(Debug)]
pub enum WorkerReply {
    /// The sink accepted `Init`; the container is open.
    Initialized,
    /// A frame was consumed; one in-flight slot is free again.
    FrameEncoded(FrameIndex),
    /// The container is finalized.
    Done(SinkOutput),
    /// The worker failed and has stopped.
    Error(String),
}

/// Handle to the dedicated encoding thread.
///
/// The render side keeps the in-flight counter: [`EncodeWorker::submit`] blocks on the reply
/// channel while `ceiling` frames are unconfirmed.
pub struct EncodeWorker {
    requests: Option<Sender<WorkerRequest>>,
    replies: Receiver<WorkerReply>,
    handle: Option<JoinHandle<()>>,
    ceiling: usize,
    in_flight: usize,
    max_in_flight: usize,
    submitted: u64,
}

impl std::fmt::Debug for EncodeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeWorker")
            .field("ceiling", &self.ceiling)
            .field("in_flight", &self.in_flight)
            .field("submitted", &self.submitted)
            .finish()
    }
}

impl EncodeWorker {
    /// Move `sink` onto a new worker thread. Nothing is sent to it until [`EncodeWorker::init`].
    pub fn spawn(sink: Box<dyn FrameSink>, ceiling: usize) -> LyrisyncResult<Self> {
        let (req_tx, req_rx) = mpsc::channel();
        let (rep_tx, rep_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("lyrisync-encode".to_owned())
            .spawn(move || run_worker(sink, req_rx, rep_tx))
            .map_err(|e| LyrisyncError::encode(format!("failed to spawn encode worker: {e}")))?;
        Ok(Self {
            requests: Some(req_tx),
            replies: rep_rx,
            handle: Some(handle),
            ceiling: ceiling.max(1),
            in_flight: 0,
            max_in_flight: 0,
            submitted: 0,
        })
    }

    /// Send `Init` and wait until the sink has started.
    pub fn init(&mut self, cfg: SinkConfig) -> LyrisyncResult<()> {
        self.send(WorkerRequest::Init(cfg))?;
        loop {
            let reply = self.replies.recv().map_err(|_| self.disconnected())?;
            if let WorkerReply::Initialized = reply {
                return Ok(());
            }
            self.on_reply(reply)?;
        }
    }

    /// Queue one frame, first waiting for a free slot when at the ceiling.
    pub fn submit(&mut self, index: FrameIndex, frame: FrameRGBA) -> LyrisyncResult<()> {
        self.drain_ready()?;
        while self.in_flight >= self.ceiling {
            let reply = self.replies.recv().map_err(|_| self.disconnected())?;
            self.on_reply(reply)?;
        }
        self.send(WorkerRequest::EncodeFrame { index, frame })?;
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
        self.submitted += 1;
        Ok(())
    }

    /// Send `Finalize` and wait for `Done`.
    pub fn finalize(mut self) -> LyrisyncResult<SinkOutput> {
        self.send(WorkerRequest::Finalize)?;
        loop {
            let reply = self.replies.recv().map_err(|_| self.disconnected())?;
            if let WorkerReply::Done(out) = reply {
                self.in_flight = 0;
                self.join();
                return Ok(out);
            }
            self.on_reply(reply)?;
        }
    }

    /// Stop the worker without finalizing; the sink is aborted.
    pub fn terminate(mut self) {
        self.join();
    }

    /// Frames sent and not yet confirmed.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Highest in-flight count seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Frames sent so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    fn send(&mut self, req: WorkerRequest) -> LyrisyncResult<()> {
        let Some(tx) = self.requests.as_ref() else {
            return Err(LyrisyncError::encode("encode worker already stopped"));
        };
        if tx.send(req).is_ok() {
            return Ok(());
        }
        // The worker hung up; it normally left an error behind.
        while let Ok(reply) = self.replies.try_recv() {
            self.on_reply(reply)?;
        }
        Err(self.disconnected())
    }

    fn drain_ready(&mut self) -> LyrisyncResult<()> {
        loop {
            match self.replies.try_recv() {
                Ok(reply) => self.on_reply(reply)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(self.disconnected()),
            }
        }
    }

    fn on_reply(&mut self, reply: WorkerReply) -> LyrisyncResult<()> {
        match reply {
            WorkerReply::FrameEncoded(_) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Ok(())
            }
            WorkerReply::Error(msg) => Err(LyrisyncError::encode(msg)),
            WorkerReply::Initialized => Err(LyrisyncError::encode(
                "encode worker started twice",
            )),
            WorkerReply::Done(_) => Err(LyrisyncError::encode(
                "encode worker finished before it was asked to",
            )),
        }
    }

    fn disconnected(&self) -> LyrisyncError {
        LyrisyncError::encode("encode worker stopped unexpectedly")
    }

    fn join(&mut self) {
        drop(self.requests.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("encode worker panicked");
        }
    }
}

impl Drop for EncodeWorker {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_worker(
    mut sink: Box<dyn FrameSink>,
    requests: Receiver<WorkerRequest>,
    replies: Sender<WorkerReply>,
) {
    let mut started = false;
    while let Ok(req) = requests.recv() {
        let res = match req {
            WorkerRequest::Init(cfg) => sink.begin(cfg).map(|()| {
                started = true;
                WorkerReply::Initialized
            }),
            WorkerRequest::EncodeFrame { index, frame } => sink
                .push_frame(index, &frame)
                .map(|()| WorkerReply::FrameEncoded(index)),
            WorkerRequest::Finalize => match sink.end() {
                Ok(out) => {
                    let _ = replies.send(WorkerReply::Done(out));
                    return;
                }
                Err(e) => Err(e),
            },
        };
        match res {
            Ok(reply) => {
                if replies.send(reply).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "encode worker failed");
                sink.abort();
                let _ = replies.send(WorkerReply::Error(e.to_string()));
                return;
            }
        }
    }
    // Hung up without `Finalize`.
    if started {
        sink.abort();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/worker.rs"]
mod tests;
