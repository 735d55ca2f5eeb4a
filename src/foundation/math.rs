pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Linear interpolation from `a` toward `b` by `t`.
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Mean of a byte slice in `[0, 1]`; empty slices are silent.
pub(crate) fn mean_unit(bytes: &[u8]) -> f32 {
    if bytes.is_empty() {
        return 0.0;
    }
    let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
    (sum as f32) / (bytes.len() as f32 * 255.0)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
