//! Scrolling lyric layout, independent of any raster backend.
//!
//! The layout is driven by one floating-point line position ([`SmoothState`]) that eases toward
//! the line being sung. Slot offsets are computed from unscaled reference heights so they stay
//! put while glyphs grow and shrink with distance from the center.

use crate::lyrics::word::{AlignedWord, LineGroup};

/// A first line further away than this is not pre-selected; the scroll holds instead.
pub const HOLD_LOOKAHEAD_S: f64 = 4.0;
/// Jumps longer than this many lines (seeks) snap instead of easing.
pub const SNAP_DISTANCE_LINES: f64 = 4.0;
/// Lines drawn above the smooth center.
pub const LINES_ABOVE: usize = 2;
/// Lines drawn below the smooth center.
pub const LINES_BELOW: usize = 3;

const SCALE_FALLOFF: f64 = 0.12;
const MIN_SCALE: f64 = 0.64;
const OPACITY_FALLOFF: f64 = 0.28;
const MIN_OPACITY: f64 = 0.08;
/// Extra space between slots as a fraction of the font size.
const LINE_GAP_EM: f64 = 0.45;

/// Index of the line the scroll should move toward at `time`.
///
/// The line containing `time` wins. Otherwise the next upcoming line is pre-selected, except that
/// the very first line is only pre-selected once it is at most [`HOLD_LOOKAHEAD_S`] away. After
/// the last line ends the last line stays selected. `None` means hold position.
pub fn resolve_target_line(lines: &[LineGroup], time: f64) -> Option<usize> {
    if let Some(i) = active_line(lines, time) {
        return Some(i);
    }
    match lines.iter().position(|l| l.start_s() > time) {
        Some(0) if lines[0].start_s() - time > HOLD_LOOKAHEAD_S => None,
        Some(i) => Some(i),
        None => lines.len().checked_sub(1),
    }
}

/// Index of the line whose span contains `time`.
pub fn active_line(lines: &[LineGroup], time: f64) -> Option<usize> {
    lines.iter().position(|l| l.contains_time(time))
}

/// The scroll position shared by live preview and offline render.
///
/// Exactly one owner advances it at a time; see
/// [`PreviewHandoff`](crate::session::preview::PreviewHandoff).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothState {
    /// Fractional line index at the vertical center.
    pub index: f64,
}

impl SmoothState {
    /// Scroll position at line 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to line 0.
    pub fn reset(&mut self) {
        self.index = 0.0;
    }

    /// Ease toward `target` by `smoothing` of the remaining distance; snap on long jumps.
    pub fn advance(&mut self, target: Option<usize>, smoothing: f64) {
        let Some(target) = target else {
            return;
        };
        let target = target as f64;
        let delta = target - self.index;
        if delta.abs() > SNAP_DISTANCE_LINES {
            self.index = target;
        } else {
            self.index += delta * smoothing.clamp(0.0, 1.0);
        }
    }
}

/// Text metrics needed to place slots.
pub trait TextMeasure {
    /// Height of `text` laid out at `font_size` and wrapped at `max_width`.
    fn block_height(&mut self, text: &str, font_size: f32, max_width: f32) -> f32;
}

/// Monospace-ish estimate used when no font is loaded.
#[derive(Clone, Copy, Debug)]
pub struct EstimatedMeasure {
    /// Average glyph advance as a fraction of the font size.
    pub char_width_em: f32,
    /// Line height as a fraction of the font size.
    pub line_height_em: f32,
}

impl Default for EstimatedMeasure {
    fn default() -> Self {
        Self {
            char_width_em: 0.55,
            line_height_em: 1.25,
        }
    }
}

impl EstimatedMeasure {
    /// Estimated advance of `text`.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.char_width_em
    }
}

impl TextMeasure for EstimatedMeasure {
    fn block_height(&mut self, text: &str, font_size: f32, max_width: f32) -> f32 {
        let width = self.text_width(text, font_size);
        let rows = if max_width > 0.0 {
            (width / max_width).ceil().max(1.0)
        } else {
            1.0
        };
        rows * font_size * self.line_height_em
    }
}

/// One visible line of the scroll window.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSlot {
    /// Index into the lines.
    pub line_index: usize,
    /// Signed distance from the smooth center in lines.
    pub distance: f64,
    /// Vertical center of the slot in pixels.
    pub center_y: f64,
    /// Glyph scale inside the slot.
    pub scale: f64,
    /// Line opacity.
    pub opacity: f64,
    /// Whether this line contains the current time.
    pub is_active: bool,
}

/// Geometry inputs of [`layout_window`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowMetrics {
    /// Canvas height.
    pub canvas_height: f64,
    /// Shift of the lyric block from the vertical center.
    pub vertical_offset: f64,
    /// Center-slot font size.
    pub font_size: f32,
    /// Wrap width.
    pub max_width: f32,
}

/// Place the lines around `smooth.index` (two above, three below).
pub fn layout_window(
    lines: &[LineGroup],
    time: f64,
    smooth: &SmoothState,
    metrics: WindowMetrics,
    measure: &mut dyn TextMeasure,
) -> Vec<LineSlot> {
    if lines.is_empty() {
        return Vec::new();
    }
    let last = lines.len() - 1;
    let center = smooth.index.clamp(0.0, last as f64);
    let k = center.floor() as usize;
    let frac = center - k as f64;

    let first = k.saturating_sub(LINES_ABOVE);
    let end = (k + LINES_BELOW + 1).min(last);
    let gap = f64::from(metrics.font_size) * LINE_GAP_EM;

    // Reference heights over [first, end]; `end` may be one past the window for interpolation.
    let heights: Vec<f64> = (first..=end)
        .map(|i| {
            let text = lines[i].text();
            f64::from(measure.block_height(&text, metrics.font_size, metrics.max_width)) + gap
        })
        .collect();
    let mut pos = vec![0.0f64; heights.len()];
    for j in 1..heights.len() {
        pos[j] = pos[j - 1] + (heights[j - 1] + heights[j]) / 2.0;
    }
    let kj = k - first;
    let scroll = match pos.get(kj + 1) {
        Some(next) => pos[kj] + frac * (next - pos[kj]),
        None => pos[kj],
    };

    let anchor = metrics.canvas_height / 2.0 + metrics.vertical_offset;
    let active = active_line(lines, time);
    let visible_end = (k + LINES_BELOW).min(last);

    (first..=visible_end)
        .map(|i| {
            let distance = i as f64 - center;
            let d = distance.abs();
            LineSlot {
                line_index: i,
                distance,
                center_y: anchor + pos[i - first] - scroll,
                scale: (1.0 - SCALE_FALLOFF * d).max(MIN_SCALE),
                opacity: (1.0 - OPACITY_FALLOFF * d).max(MIN_OPACITY),
                is_active: active == Some(i),
            }
        })
        .collect()
}

/// How a word of the active line is colored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordPhase {
    /// Being sung now.
    Active,
    /// Already sung.
    Past,
    /// Not reached yet.
    Upcoming,
}

/// Phase of `word` at `time`.
pub fn word_phase(word: &AlignedWord, time: f64) -> WordPhase {
    if word.contains_time(time) {
        WordPhase::Active
    } else if word.end_s < time {
        WordPhase::Past
    } else {
        WordPhase::Upcoming
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/lyrics.rs"]
mod tests;
