use std::sync::Arc;

use crate::assets::decode::DecodedImage;
use crate::foundation::core::{Affine, Bitmap, Rect, Rgba8Premul, SurfaceSize};
use crate::foundation::error::DecalResult;

/// Outline style for [`DrawSurface::stroke_rect`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    /// Stroke color.
    pub color: Rgba8Premul,
    /// Line width in the local units of the stroke's transform.
    pub width: f64,
}

/// A 2D drawing target the compositor paints into.
///
/// Calls between [`DrawSurface::clear`] and [`DrawSurface::snapshot`] describe one frame, painted
/// in call order.
pub trait DrawSurface {
    /// Pixel size of the surface.
    fn size(&self) -> SurfaceSize;

    /// Start a new frame on a fully transparent surface.
    fn clear(&mut self) -> DecalResult<()>;

    /// Fill `rect` (local coordinates) mapped through `transform`.
    fn fill_rect(&mut self, rect: Rect, transform: Affine, color: Rgba8Premul) -> DecalResult<()>;

    /// Draw `image` occupying the local rectangle `(0, 0, width, height)` mapped through
    /// `transform`.
    fn draw_image(&mut self, image: &Arc<DecodedImage>, transform: Affine) -> DecalResult<()>;

    /// Outline `rect` (local coordinates) mapped through `transform`.
    fn stroke_rect(&mut self, rect: Rect, transform: Affine, style: &StrokeStyle)
    -> DecalResult<()>;

    /// Finish the frame and copy it out as a new bitmap.
    fn snapshot(&mut self) -> DecalResult<Bitmap>;
}
