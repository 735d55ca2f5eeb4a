//! Shared primitives: time, color, geometry, errors and small integer math.

/// Frame/time primitives, colors and re-exported geometry.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
