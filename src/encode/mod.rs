//! Encoding: frame sinks and the dedicated encode worker.
//!
//! The render loop never talks to a sink directly. Frames go through [`worker::EncodeWorker`],
//! which owns the sink on its own thread and bounds the number of frames in flight.

/// `ffmpeg`-based sink (MP4 to a file or to memory).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
/// Encode worker thread and its message protocol.
pub mod worker;
