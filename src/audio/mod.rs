//! Track audio: decode to PCM and frame-synchronized analysis.

/// Analyser-node style FFT analysis (offline pass and live preview).
pub mod analyser;
/// `ffmpeg` decode to interleaved `f32` PCM.
pub mod decode;
