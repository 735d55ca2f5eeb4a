//! Frame compositor: background, visualizer, then the scrolling lyric window.

use crate::audio::analyser::AnalysisFrame;
use crate::config::{VisualSettings, VisualizerStyle};
use crate::foundation::core::{Canvas, Rect, Rgba8};
use crate::foundation::error::LyrisyncResult;
use crate::lyrics::word::LineGroup;
use crate::render::background::Background;
use crate::render::lyrics::{
    EstimatedMeasure, LineSlot, SmoothState, TextMeasure, WindowMetrics, WordPhase,
    layout_window, resolve_target_line, word_phase,
};
use crate::render::surface::{FrameRGBA, Surface};
use crate::render::text::{LyricFont, TextBrush, word_byte_ranges};
use crate::render::visualizer::{VisualizerParams, draw_visualizer};

/// Lyric wrap width as a share of the canvas width.
const TEXT_WIDTH_SHARE: f32 = 0.86;
const GLOW_RADIUS_EM: f64 = 0.06;
/// Height of a placeholder word block relative to the font size.
const BLOCK_HEIGHT_EM: f64 = 0.7;

/// Draws complete frames onto one reusable surface.
#[derive(Debug)]
pub struct FrameRenderer {
    surface: Surface,
    visual: VisualSettings,
    background: Background,
    font: Option<LyricFont>,
    estimate: EstimatedMeasure,
}

impl FrameRenderer {
    /// Allocate the surface and load the configured font, if any.
    pub fn new(
        canvas: Canvas,
        visual: VisualSettings,
        background: Background,
    ) -> LyrisyncResult<Self> {
        let font = match &visual.font_path {
            Some(path) => Some(LyricFont::from_path(path)?),
            None => None,
        };
        Ok(Self {
            surface: Surface::new(canvas.width, canvas.height)?,
            visual,
            background,
            font,
            estimate: EstimatedMeasure::default(),
        })
    }

    /// Visual settings in use.
    pub fn visual(&self) -> &VisualSettings {
        &self.visual
    }

    /// Render the frame at `time`, advancing `smooth` by one step.
    #[tracing::instrument(level = "trace", skip(self, lines, smooth, analysis))]
    pub fn render_frame(
        &mut self,
        time: f64,
        lines: &[LineGroup],
        smooth: &mut SmoothState,
        analysis: Option<&AnalysisFrame>,
    ) -> LyrisyncResult<FrameRGBA> {
        self.surface.begin_frame();
        self.background
            .draw(&mut self.surface, time, self.visual.background_color)?;

        if let Some(frame) = analysis
            && self.visual.style != VisualizerStyle::None
        {
            let params = VisualizerParams {
                color: self.visual.visualizer_color,
                sensitivity: self.visual.sensitivity,
                bar_count: self.visual.bar_count,
            };
            draw_visualizer(&mut self.surface, self.visual.style, frame, &params);
        }

        smooth.advance(resolve_target_line(lines, time), self.visual.smoothing);
        if self.visual.show_lyrics {
            self.draw_lyrics(time, lines, smooth);
        }
        Ok(self.surface.snapshot())
    }

    fn draw_lyrics(&mut self, time: f64, lines: &[LineGroup], smooth: &SmoothState) {
        let max_width = self.surface.width() as f32 * TEXT_WIDTH_SHARE;
        let metrics = WindowMetrics {
            canvas_height: f64::from(self.surface.height()),
            vertical_offset: f64::from(self.visual.vertical_offset_px),
            font_size: self.visual.font_size_px,
            max_width,
        };
        let measure: &mut dyn TextMeasure = match &mut self.font {
            Some(font) => font,
            None => &mut self.estimate,
        };
        let slots = layout_window(lines, time, smooth, metrics, measure);

        for slot in &slots {
            let line = &lines[slot.line_index];
            let size = (f64::from(self.visual.font_size_px) * slot.scale) as f32;
            self.surface.push_opacity(slot.opacity as f32);
            if self.font.is_some() {
                self.draw_line_text(line, slot, time, size, max_width);
            } else {
                self.draw_line_blocks(line, slot, time, size, max_width);
            }
            self.surface.pop_layer();
        }
    }

    fn word_color(&self, slot: &LineSlot, phase: WordPhase) -> Rgba8 {
        if !slot.is_active {
            return self.visual.inactive_color;
        }
        match phase {
            WordPhase::Active => self.visual.active_color,
            WordPhase::Past => self.visual.read_color,
            WordPhase::Upcoming => self.visual.upcoming_color,
        }
    }

    fn draw_line_text(
        &mut self,
        line: &LineGroup,
        slot: &LineSlot,
        time: f64,
        size: f32,
        max_width: f32,
    ) {
        let text = line.text();
        let spans: Vec<_> = if slot.is_active {
            let ranges = word_byte_ranges(line.words().iter().map(|w| w.word.trim()));
            ranges
                .into_iter()
                .zip(line.words())
                .map(|(range, w)| {
                    let phase = word_phase(w, time);
                    let brush = TextBrush {
                        color: self.word_color(slot, phase),
                        glow: self.visual.glow && phase == WordPhase::Active,
                    };
                    (range, brush)
                })
                .collect()
        } else {
            Vec::new()
        };
        let default_brush = TextBrush {
            color: self.visual.inactive_color,
            glow: false,
        };
        let center_x = f64::from(self.surface.width()) / 2.0;
        let glow_radius = f64::from(size) * GLOW_RADIUS_EM;

        let Some(font) = self.font.as_mut() else {
            return;
        };
        let block = font.layout(&text, size, max_width, default_brush, &spans);
        let top = slot.center_y - f64::from(block.height()) / 2.0;
        font.draw(&mut self.surface, &block, center_x, top, glow_radius);
    }

    /// Fontless rendering: one rounded block per word, wrapped and centered like text.
    fn draw_line_blocks(
        &mut self,
        line: &LineGroup,
        slot: &LineSlot,
        time: f64,
        size: f32,
        max_width: f32,
    ) {
        let rows = block_rows(line, &self.estimate, size, max_width);
        let row_h = f64::from(size * self.estimate.line_height_em);
        let block_h = f64::from(size) * BLOCK_HEIGHT_EM;
        let space = f64::from(self.estimate.text_width(" ", size));
        let center_x = f64::from(self.surface.width()) / 2.0;
        let mut top = slot.center_y - row_h * rows.len() as f64 / 2.0;

        for row in &rows {
            let mut x = center_x - row.width / 2.0;
            let y = top + (row_h - block_h) / 2.0;
            for &(wi, w) in &row.words {
                let color = self.word_color(slot, word_phase(&line.words()[wi], time));
                let rect = Rect::new(x, y, x + w, y + block_h);
                self.surface.fill_rounded_rect(rect, block_h * 0.3, color);
                x += w + space;
            }
            top += row_h;
        }
    }
}

struct BlockRow {
    /// `(word index, width)` pairs.
    words: Vec<(usize, f64)>,
    width: f64,
}

fn block_rows(
    line: &LineGroup,
    estimate: &EstimatedMeasure,
    size: f32,
    max_width: f32,
) -> Vec<BlockRow> {
    let space = f64::from(estimate.text_width(" ", size));
    let max_width = f64::from(max_width);
    let mut rows = vec![BlockRow {
        words: Vec::new(),
        width: 0.0,
    }];
    for (i, w) in line.words().iter().enumerate() {
        let width = f64::from(estimate.text_width(w.word.trim(), size));
        let Some(row) = rows.last_mut() else {
            break;
        };
        let needed = if row.words.is_empty() {
            width
        } else {
            row.width + space + width
        };
        if needed > max_width && !row.words.is_empty() {
            rows.push(BlockRow {
                words: vec![(i, width)],
                width,
            });
        } else {
            row.words.push((i, width));
            row.width = needed;
        }
    }
    rows
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
