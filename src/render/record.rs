use std::sync::Arc;

use crate::assets::decode::{DecodedImage, ImageId};
use crate::foundation::core::{Affine, Bitmap, Rect, Rgba8Premul, SurfaceSize};
use crate::foundation::error::DecalResult;
use crate::render::surface::{DrawSurface, StrokeStyle};

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    /// A frame was started.
    Clear,
    /// A filled rectangle.
    FillRect {
        /// Local rectangle.
        rect: Rect,
        /// Local-to-surface transform.
        transform: Affine,
        /// Fill color.
        color: Rgba8Premul,
    },
    /// An image drawn over its local `(0, 0, w, h)` rectangle.
    Image {
        /// Which decoded image.
        image: ImageId,
        /// Native image size.
        size: SurfaceSize,
        /// Local-to-surface transform.
        transform: Affine,
    },
    /// A stroked rectangle outline.
    StrokeRect {
        /// Local rectangle.
        rect: Rect,
        /// Local-to-surface transform.
        transform: Affine,
        /// Stroke style.
        style: StrokeStyle,
    },
}

/// A surface that records calls instead of rasterizing them.
///
/// Snapshots are transparent bitmaps of the surface size.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    size: SurfaceSize,
    calls: Vec<DrawCall>,
}

impl RecordingSurface {
    /// Empty recorder for a surface of `size`.
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            calls: Vec::new(),
        }
    }

    /// Calls recorded since construction, in order.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Image calls only.
    pub fn images(&self) -> impl Iterator<Item = (ImageId, Affine)> + '_ {
        self.calls.iter().filter_map(|c| match c {
            DrawCall::Image {
                image, transform, ..
            } => Some((*image, *transform)),
            _ => None,
        })
    }

    /// Number of stroke calls.
    pub fn stroke_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::StrokeRect { .. }))
            .count()
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn clear(&mut self) -> DecalResult<()> {
        self.calls.push(DrawCall::Clear);
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Rgba8Premul) -> DecalResult<()> {
        self.calls.push(DrawCall::FillRect {
            rect,
            transform,
            color,
        });
        Ok(())
    }

    fn draw_image(&mut self, image: &Arc<DecodedImage>, transform: Affine) -> DecalResult<()> {
        self.calls.push(DrawCall::Image {
            image: image.id(),
            size: image.size(),
            transform,
        });
        Ok(())
    }

    fn stroke_rect(
        &mut self,
        rect: Rect,
        transform: Affine,
        style: &StrokeStyle,
    ) -> DecalResult<()> {
        self.calls.push(DrawCall::StrokeRect {
            rect,
            transform,
            style: *style,
        });
        Ok(())
    }

    fn snapshot(&mut self) -> DecalResult<Bitmap> {
        Ok(Bitmap::transparent(self.size))
    }
}
