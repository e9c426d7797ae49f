use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::assets::decode::{DecodedImage, ImageId};
use crate::foundation::core::{Affine, Bitmap, Rect, Rgba8Premul, SurfaceSize};
use crate::foundation::error::{DecalError, DecalResult};
use crate::render::surface::{DrawSurface, StrokeStyle};

/// CPU raster surface powered by `vello_cpu`.
///
/// The render context and pixmap are reused across frames while the size is unchanged, and
/// image paints are cached per [`ImageId`].
pub struct CpuSurface {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    image_cache: HashMap<ImageId, vello_cpu::Image>,
}

fn dims_to_u16(size: SurfaceSize) -> DecalResult<(u16, u16)> {
    let w: u16 = size
        .width
        .try_into()
        .map_err(|_| DecalError::render("surface width exceeds u16"))?;
    let h: u16 = size
        .height
        .try_into()
        .map_err(|_| DecalError::render("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(DecalError::validation("surface size must be non-zero"));
    }
    Ok((w, h))
}

impl CpuSurface {
    /// Allocate a transparent surface of `size`.
    pub fn new(size: SurfaceSize) -> DecalResult<Self> {
        let (width, height) = dims_to_u16(size)?;
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
            pixmap: vello_cpu::Pixmap::new(width, height),
            image_cache: HashMap::new(),
        })
    }

    /// Reallocate for a new size; a no-op when the size is unchanged. The image cache survives.
    pub fn resize(&mut self, size: SurfaceSize) -> DecalResult<()> {
        let (width, height) = dims_to_u16(size)?;
        if width == self.width && height == self.height {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        self.ctx = vello_cpu::RenderContext::new(width, height);
        self.pixmap = vello_cpu::Pixmap::new(width, height);
        Ok(())
    }

    /// Drop cached paints for images not in `live`.
    pub fn retain_images(&mut self, live: impl IntoIterator<Item = ImageId>) {
        let live: HashSet<ImageId> = live.into_iter().collect();
        self.image_cache.retain(|id, _| live.contains(id));
    }

    /// Number of cached image paints.
    pub fn cached_images(&self) -> usize {
        self.image_cache.len()
    }

    fn image_paint_for(&mut self, image: &DecodedImage) -> DecalResult<vello_cpu::Image> {
        if let Some(paint) = self.image_cache.get(&image.id()) {
            return Ok(paint.clone());
        }

        let pixmap = image_premul_bytes_to_pixmap(
            image.rgba8_premul.as_slice(),
            image.width,
            image.height,
        )?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        self.image_cache.insert(image.id(), paint.clone());
        Ok(paint)
    }
}

impl DrawSurface for CpuSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize {
            width: u32::from(self.width),
            height: u32::from(self.height),
        }
    }

    fn clear(&mut self) -> DecalResult<()> {
        self.ctx.reset();
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Rgba8Premul) -> DecalResult<()> {
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(color_to_cpu(color));
        self.ctx.fill_rect(&rect_to_cpu(rect));
        Ok(())
    }

    fn draw_image(&mut self, image: &Arc<DecodedImage>, transform: Affine) -> DecalResult<()> {
        let paint = self.image_paint_for(image)?;
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(paint);
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, image.w(), image.h()));
        Ok(())
    }

    fn stroke_rect(
        &mut self,
        rect: Rect,
        transform: Affine,
        style: &StrokeStyle,
    ) -> DecalResult<()> {
        if !style.width.is_finite() || style.width <= 0.0 {
            return Ok(());
        }
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(color_to_cpu(style.color));
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(style.width));
        self.ctx.stroke_rect(&rect_to_cpu(rect));
        Ok(())
    }

    fn snapshot(&mut self) -> DecalResult<Bitmap> {
        self.ctx.flush();
        clear_pixmap(&mut self.pixmap, [0, 0, 0, 0]);
        self.ctx.render_to_pixmap(&mut self.pixmap);
        Bitmap::from_premul(self.size(), self.pixmap.data_as_u8_slice().to_vec())
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    let data = pixmap.data_as_u8_slice_mut();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

// peniko colors are straight alpha.
fn color_to_cpu(c: Rgba8Premul) -> vello_cpu::peniko::Color {
    let mut px = c.to_array();
    crate::foundation::math::unpremultiply_rgba8_in_place(&mut px);
    vello_cpu::peniko::Color::from_rgba8(px[0], px[1], px[2], px[3])
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> DecalResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| DecalError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| DecalError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(DecalError::render("decoded image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
