//! CPU raster surface backed by `vello_cpu`.
//!
//! Geometry is built with the crate's `kurbo` and converted to `vello_cpu`'s re-exported
//! `kurbo` at the draw call.

use std::sync::Arc;

use kurbo::{PathEl, Shape as _};

use crate::foundation::core::{Affine, BezPath, Rect, Rgba8};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// A rendered frame as premultiplied RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major, premultiplied.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// Raster image ready to be used as a paint.
#[derive(Clone)]
pub struct SurfaceImage {
    paint: vello_cpu::Image,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Debug for SurfaceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl SurfaceImage {
    /// Wrap straight-alpha RGBA8 pixels.
    pub fn from_straight_rgba8(bytes: &[u8], width: u32, height: u32) -> LyrisyncResult<Self> {
        let mut tmp = bytes.to_vec();
        premultiply_rgba8_in_place(&mut tmp);
        Self::from_premul_rgba8(&tmp, width, height)
    }

    /// Wrap premultiplied RGBA8 pixels.
    pub fn from_premul_rgba8(bytes: &[u8], width: u32, height: u32) -> LyrisyncResult<Self> {
        let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width,
            height,
        })
    }
}

/// Drawing target for one frame at a time.
pub struct Surface {
    width: u32,
    height: u32,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Surface {
    /// Allocate a surface; both sides must be non-zero and fit in `u16`.
    pub fn new(width: u32, height: u32) -> LyrisyncResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| LyrisyncError::validation("surface width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| LyrisyncError::validation("surface height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(LyrisyncError::validation("surface size must be non-zero"));
        }
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whole-surface rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Drop all recorded commands and start a new frame.
    pub fn begin_frame(&mut self) {
        self.ctx.reset();
        self.ctx
            .set_blend_mode(vello_cpu::peniko::BlendMode::default());
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    }

    /// Set the geometry transform for subsequent draws.
    pub fn set_transform(&mut self, transform: Affine) {
        self.ctx.set_transform(affine_to_cpu(transform));
    }

    /// Fill an axis-aligned rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        self.set_color(color);
        self.ctx.fill_rect(&rect_to_cpu(rect));
    }

    /// Fill a rounded rectangle.
    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgba8) {
        let mut path = BezPath::new();
        for el in kurbo::RoundedRect::from_rect(rect, radius).path_elements(0.1) {
            path.push(el);
        }
        self.fill_path(&path, color);
    }

    /// Fill a closed path (non-zero winding).
    pub fn fill_path(&mut self, path: &BezPath, color: Rgba8) {
        if color.a == 0 {
            return;
        }
        self.set_color(color);
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    /// Stroke a path with round joins and caps.
    pub fn stroke_path(&mut self, path: &BezPath, width: f64, color: Rgba8) {
        if color.a == 0 || width <= 0.0 {
            return;
        }
        let style = kurbo::Stroke::new(width)
            .with_join(kurbo::Join::Round)
            .with_caps(kurbo::Cap::Round);
        let outline = kurbo::stroke(
            path.elements().iter().copied(),
            &style,
            &kurbo::StrokeOpts::default(),
            0.1,
        );
        self.fill_path(&outline, color);
    }

    /// Draw `image` stretched into `dest`.
    pub fn fill_image(&mut self, image: &SurfaceImage, dest: Rect) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let sx = dest.width() / f64::from(image.width);
        let sy = dest.height() / f64::from(image.height);
        let placement = Affine::translate((dest.x0, dest.y0)) * Affine::scale_non_uniform(sx, sy);
        self.ctx.set_transform(affine_to_cpu(placement));
        self.ctx.set_paint(image.paint.clone());
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    }

    /// Group subsequent draws under a uniform opacity until [`Surface::pop_layer`].
    pub fn push_opacity(&mut self, opacity: f32) {
        self.ctx.push_opacity_layer(opacity.clamp(0.0, 1.0));
    }

    /// Close the most recent layer.
    pub fn pop_layer(&mut self) {
        self.ctx.pop_layer();
    }

    /// Fill positioned glyphs from `font`.
    pub(crate) fn fill_glyphs(
        &mut self,
        font: &vello_cpu::peniko::FontData,
        font_size: f32,
        color: Rgba8,
        glyphs: impl Iterator<Item = vello_cpu::Glyph>,
    ) {
        self.set_color(color);
        self.ctx
            .glyph_run(font)
            .font_size(font_size)
            .fill_glyphs(glyphs);
    }

    /// Rasterize everything recorded since [`Surface::begin_frame`] and copy it out.
    pub fn snapshot(&mut self) -> FrameRGBA {
        self.pixmap.data_as_u8_slice_mut().fill(0);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        FrameRGBA {
            width: self.width,
            height: self.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
        }
    }

    fn set_color(&mut self, c: Rgba8) {
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> LyrisyncResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| LyrisyncError::evaluation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| LyrisyncError::evaluation("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(LyrisyncError::evaluation("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
