//! Frame rendering on the CPU.
//!
//! [`frame::FrameRenderer`] composes one frame from a [`background::Background`], the
//! [`visualizer`] layer and the scrolling lyric window laid out by [`lyrics`].

/// Solid, image and looping-video backgrounds.
pub mod background;
/// Frame compositor.
pub mod frame;
/// Scroll-window layout and word phases.
pub mod lyrics;
/// `vello_cpu` drawing surface.
pub mod surface;
/// Font loading and text shaping.
pub mod text;
/// Audio-reactive styles.
pub mod visualizer;
