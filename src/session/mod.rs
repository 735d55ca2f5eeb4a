//! Sessions that drive the frame renderer: offline export and live preview.

/// Live preview loop state and the handoff to an offline render.
pub mod preview;
/// Offline render pipeline.
pub mod render_session;
