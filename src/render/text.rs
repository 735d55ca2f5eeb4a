//! Lyric text shaping with Parley and glyph drawing through `vello_cpu`.

use std::ops::Range;
use std::path::Path;

use crate::foundation::core::{Affine, Rgba8};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::render::lyrics::TextMeasure;
use crate::render::surface::Surface;

/// Brush attached to a text range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrush {
    pub(crate) color: Rgba8,
    /// Draw a halo behind this range.
    pub(crate) glow: bool,
}

/// A laid-out block of lyric text.
pub(crate) struct TextBlock {
    layout: parley::Layout<TextBrush>,
    max_width: f32,
}

impl TextBlock {
    pub(crate) fn height(&self) -> f32 {
        self.layout.height()
    }
}

/// One registered font plus the Parley contexts used to shape with it.
pub struct LyricFont {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for LyricFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyricFont")
            .field("family_name", &self.family_name)
            .finish()
    }
}

impl LyricFont {
    /// Read a TTF/OTF file.
    pub fn from_path(path: &Path) -> LyrisyncResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            LyrisyncError::validation(format!("failed to read font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    /// Register font bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> LyrisyncResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            LyrisyncError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LyrisyncError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0),
        })
    }

    /// Shape `text` with a default brush and per-range overrides, wrapping at `max_width`.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        max_width: f32,
        default_brush: TextBrush,
        spans: &[(Range<usize>, TextBrush)],
    ) -> TextBlock {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(default_brush));
        for (range, brush) in spans {
            builder.push(parley::style::StyleProperty::Brush(*brush), range.clone());
        }

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(Some(max_width));
        layout.align(
            Some(max_width),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        TextBlock { layout, max_width }
    }

    /// Draw `block` horizontally centered on `center_x`, with its top at `top`.
    ///
    /// Each visual row is centered on its own advance.
    pub(crate) fn draw(
        &self,
        surface: &mut Surface,
        block: &TextBlock,
        center_x: f64,
        top: f64,
        glow_radius: f64,
    ) {
        let left = center_x - f64::from(block.max_width) / 2.0;
        for line in block.layout.lines() {
            let slack = f64::from(block.max_width - line.metrics().advance).max(0.0) / 2.0;
            let origin = Affine::translate((left + slack, top));
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                let size = run.run().font_size();
                let glyphs = || {
                    run.glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                };

                if brush.glow && glow_radius > 0.0 {
                    let halo = brush.color.with_opacity(0.18);
                    for (dx, dy) in GLOW_OFFSETS {
                        surface.set_transform(
                            Affine::translate((dx * glow_radius, dy * glow_radius)) * origin,
                        );
                        surface.fill_glyphs(&self.font, size, halo, glyphs());
                    }
                }
                surface.set_transform(origin);
                surface.fill_glyphs(&self.font, size, brush.color, glyphs());
            }
        }
        surface.set_transform(Affine::IDENTITY);
    }
}

const GLOW_OFFSETS: [(f64, f64); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (0.7, 0.7),
    (-0.7, 0.7),
    (0.7, -0.7),
    (-0.7, -0.7),
];

impl TextMeasure for LyricFont {
    fn block_height(&mut self, text: &str, font_size: f32, max_width: f32) -> f32 {
        self.layout(text, font_size, max_width, TextBrush::default(), &[])
            .height()
    }
}

/// Byte ranges of each word when `words` are joined by single spaces.
pub(crate) fn word_byte_ranges<'a>(words: impl Iterator<Item = &'a str>) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut at = 0usize;
    for (i, w) in words.enumerate() {
        if i > 0 {
            at += 1;
        }
        out.push(at..at + w.len());
        at += w.len();
    }
    out
}
