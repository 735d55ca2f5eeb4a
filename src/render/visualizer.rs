//! Audio-reactive layer drawn under the lyrics.
//!
//! Every style is a deterministic function of one [`AnalysisFrame`] and [`VisualizerParams`].

use std::f64::consts::TAU;

use crate::audio::analyser::AnalysisFrame;
use crate::config::VisualizerStyle;
use crate::foundation::core::{BezPath, Point, Rect, Rgba8};
use crate::foundation::math::{lerp, mean_unit};
use crate::render::surface::Surface;

/// Share of the spectrum used by bar styles; the top bins are mostly empty.
const USABLE_SPECTRUM: f64 = 0.7;
/// Share of the spectrum counted as bass.
const BASS_SPECTRUM: f64 = 0.06;
/// Share of the spectrum that drives the circular contour.
const LOW_SPECTRUM: f64 = 0.25;
const WAVE_SEGMENTS: usize = 48;
const CONTOUR_POINTS: usize = 64;

/// Tunables shared by all styles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualizerParams {
    /// Paint color.
    pub color: Rgba8,
    /// Gain applied to levels.
    pub sensitivity: f32,
    /// Bars for `Bars` and `RadialRing`.
    pub bar_count: usize,
}

/// Draw `style` for `frame` over the whole surface.
pub fn draw_visualizer(
    surface: &mut Surface,
    style: VisualizerStyle,
    frame: &AnalysisFrame,
    params: &VisualizerParams,
) {
    let bounds = surface.bounds();
    match style {
        VisualizerStyle::None => {}
        VisualizerStyle::Wave => draw_wave(surface, bounds, &frame.data, params),
        VisualizerStyle::Bars => draw_bars(surface, bounds, &frame.data, params),
        VisualizerStyle::RadialRing => draw_radial_ring(surface, bounds, &frame.data, params),
        VisualizerStyle::CircularWave => draw_circular_wave(surface, bounds, &frame.data, params),
    }
}

/// First rising zero crossing in the first half of a time-domain array.
///
/// Starting the trace there keeps a periodic waveform still from frame to frame. Falls back to 0.
pub fn find_trigger(samples: &[u8]) -> usize {
    let half = samples.len() / 2;
    (1..half)
        .find(|&i| samples[i - 1] < 128 && samples[i] >= 128)
        .unwrap_or(0)
}

/// Average the usable spectrum into `bar_count` levels in `[0, 1]`.
pub fn bar_levels(spectrum: &[u8], bar_count: usize, sensitivity: f32) -> Vec<f32> {
    if bar_count == 0 {
        return Vec::new();
    }
    let usable = ((spectrum.len() as f64 * USABLE_SPECTRUM) as usize).max(bar_count.min(spectrum.len()));
    let bins = &spectrum[..usable];
    (0..bar_count)
        .map(|b| {
            let lo = b * bins.len() / bar_count;
            let hi = ((b + 1) * bins.len() / bar_count).max(lo + 1).min(bins.len());
            let level = if lo < hi { mean_unit(&bins[lo..hi]) } else { 0.0 };
            (level * sensitivity).clamp(0.0, 1.0)
        })
        .collect()
}

/// Mean level of the lowest bins, in `[0, 1]` before gain.
pub fn bass_energy(spectrum: &[u8]) -> f32 {
    let n = ((spectrum.len() as f64 * BASS_SPECTRUM).ceil() as usize)
        .max(1)
        .min(spectrum.len());
    mean_unit(&spectrum[..n])
}

/// Closed Catmull-Rom spline through `points`, as cubic Bézier segments.
pub fn closed_catmull_rom(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let n = points.len();
    if n < 3 {
        return path;
    }
    path.move_to(points[0]);
    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];
        let c1 = p1 + (p2 - p0) / 6.0;
        let c2 = p2 - (p3 - p1) / 6.0;
        path.curve_to(c1, c2, p2);
    }
    path.close_path();
    path
}

fn draw_wave(surface: &mut Surface, bounds: Rect, samples: &[u8], p: &VisualizerParams) {
    if samples.len() < 4 {
        return;
    }
    let start = find_trigger(samples);
    let span = samples.len() / 2;
    let window = &samples[start..(start + span).min(samples.len())];
    if window.len() < 2 {
        return;
    }

    let mid = bounds.center().y;
    let amp = bounds.height() * 0.25 * f64::from(p.sensitivity);
    let step = bounds.width() / (window.len() - 1) as f64;
    let point = |i: usize| {
        let v = (f64::from(window[i]) - 128.0) / 128.0;
        Point::new(bounds.x0 + i as f64 * step, mid - v * amp)
    };

    // Segments fade toward both edges.
    let seg_len = window.len().div_ceil(WAVE_SEGMENTS).max(1);
    let width = (bounds.height() / 240.0).max(1.5);
    let mut i = 0;
    while i + 1 < window.len() {
        let end = (i + seg_len).min(window.len() - 1);
        let mut seg = BezPath::new();
        seg.move_to(point(i));
        for j in i + 1..=end {
            seg.line_to(point(j));
        }
        let centre = (i + end) as f64 / 2.0 / (window.len() - 1) as f64;
        let fade = 1.0 - (2.0 * centre - 1.0).abs().powi(2);
        surface.stroke_path(&seg, width, p.color.with_opacity(fade as f32));
        i = end;
    }
}

fn draw_bars(surface: &mut Surface, bounds: Rect, spectrum: &[u8], p: &VisualizerParams) {
    let levels = bar_levels(spectrum, p.bar_count, p.sensitivity);
    if levels.is_empty() {
        return;
    }
    let slot = bounds.width() / levels.len() as f64;
    let bar_w = (slot * 0.7).max(1.0);
    let max_h = bounds.height() * 0.35;
    for (i, level) in levels.iter().enumerate() {
        let h = (f64::from(*level) * max_h).max(bar_w.min(4.0));
        let x = bounds.x0 + i as f64 * slot + (slot - bar_w) / 2.0;
        let rect = Rect::new(x, bounds.y1 - h, x + bar_w, bounds.y1);
        surface.fill_rounded_rect(rect, bar_w / 2.0, p.color.with_opacity(0.35 + 0.65 * level));
    }
}

fn draw_radial_ring(surface: &mut Surface, bounds: Rect, spectrum: &[u8], p: &VisualizerParams) {
    let levels = bar_levels(spectrum, p.bar_count, p.sensitivity);
    if levels.is_empty() {
        return;
    }
    let bass = (bass_energy(spectrum) * p.sensitivity).clamp(0.0, 1.0);
    let c = bounds.center();
    let base = bounds.width().min(bounds.height()) * 0.18;
    let radius = base * (1.0 + 0.25 * f64::from(bass));
    let max_len = base * 0.9;
    let width = (TAU * radius / levels.len() as f64 * 0.5).clamp(1.0, 12.0);

    for (i, level) in levels.iter().enumerate() {
        let a = TAU * i as f64 / levels.len() as f64 - TAU / 4.0;
        let dir = kurbo::Vec2::new(a.cos(), a.sin());
        let len = (f64::from(*level) * max_len).max(2.0);
        let mut ray = BezPath::new();
        ray.move_to(c + dir * radius);
        ray.line_to(c + dir * (radius + len));
        surface.stroke_path(&ray, width, p.color.with_opacity(0.4 + 0.6 * level));
    }
}

fn draw_circular_wave(surface: &mut Surface, bounds: Rect, spectrum: &[u8], p: &VisualizerParams) {
    if spectrum.is_empty() {
        return;
    }
    let low = ((spectrum.len() as f64 * LOW_SPECTRUM) as usize).clamp(1, spectrum.len());
    let bins = &spectrum[..low];
    let bass = (bass_energy(spectrum) * p.sensitivity).clamp(0.0, 1.0);
    let c = bounds.center();
    let base = bounds.width().min(bounds.height()) * 0.2 * (1.0 + 0.15 * f64::from(bass));
    let amp = base * 0.45 * f64::from(p.sensitivity);

    // Mirror the spectrum around the circle so the contour closes smoothly.
    let points: Vec<Point> = (0..CONTOUR_POINTS)
        .map(|i| {
            let u = i as f64 / CONTOUR_POINTS as f64;
            let m = 1.0 - (2.0 * u - 1.0).abs();
            let pos = lerp(0.0, (bins.len() - 1) as f64, m);
            let level = f64::from(bins[pos.round() as usize]) / 255.0;
            let a = TAU * u - TAU / 4.0;
            let r = base + amp * level;
            Point::new(c.x + r * a.cos(), c.y + r * a.sin())
        })
        .collect();
    let contour = closed_catmull_rom(&points);
    surface.fill_path(&contour, p.color.with_opacity(0.22));
    surface.stroke_path(&contour, (base / 40.0).max(1.5), p.color);
}

#[cfg(test)]
#[path = "../../tests/unit/render/visualizer.rs"]
mod tests;
