//! Decal transforms and the placement algorithm shared by every render pass.

use crate::foundation::core::{Affine, Point, Rect, SurfaceSize, Vec2};
use crate::foundation::math::deg_to_rad_wrapped;

/// Smallest user scale multiplier.
pub const SCALE_MIN: f64 = 0.1;
/// Largest user scale multiplier.
pub const SCALE_MAX: f64 = 2.0;

/// Placement of one decal in normalized surface space.
///
/// `x`/`y` are offsets from the surface center (`±0.5` is roughly the edge, but values are not
/// bounded). `scale` multiplies the automatic fit scale and stays within
/// [`SCALE_MIN`]..=[`SCALE_MAX`]. `rotation` is in degrees and interpreted mod 360.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecalTransform {
    /// Horizontal offset from the surface center, in surface widths.
    pub x: f64,
    /// Vertical offset from the surface center, in surface heights.
    pub y: f64,
    /// Multiplier applied after the fit scale.
    pub scale: f64,
    /// Rotation in degrees, clockwise in y-down surface space.
    pub rotation: f64,
}

impl Default for DecalTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl DecalTransform {
    /// Build a transform, clamping `scale` into range. Non-finite `x`, `y` or `rotation`
    /// become 0.
    pub fn new(x: f64, y: f64, scale: f64, rotation: f64) -> Self {
        Self {
            x,
            y,
            scale,
            rotation,
        }
        .clamped()
    }

    /// Same transform with `scale` clamped to [`SCALE_MIN`]..=[`SCALE_MAX`].
    ///
    /// A non-finite scale falls back to 1, any other non-finite field to 0.
    pub fn clamped(self) -> Self {
        Self {
            x: finite_or(self.x, 0.0),
            y: finite_or(self.y, 0.0),
            scale: clamp_scale(self.scale),
            rotation: finite_or(self.rotation, 0.0),
        }
    }

    /// Copy shifted by `(dx, dy)` in normalized space.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Merge the finite fields present in `patch`, then clamp. NaN and infinite patch values
    /// keep the current value.
    pub fn merge(self, patch: &TransformPatch) -> Self {
        let pick = |new: Option<f64>, old: f64| new.filter(|v| v.is_finite()).unwrap_or(old);
        Self {
            x: pick(patch.x, self.x),
            y: pick(patch.y, self.y),
            scale: pick(patch.scale, self.scale),
            rotation: pick(patch.rotation, self.rotation),
        }
        .clamped()
    }

    /// Rotation folded into `[0, 360)`.
    pub fn rotation_wrapped(self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

pub(crate) fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.clamp(SCALE_MIN, SCALE_MAX)
    } else {
        1.0
    }
}

/// A partial transform update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformPatch {
    /// New horizontal offset.
    #[serde(default)]
    pub x: Option<f64>,
    /// New vertical offset.
    #[serde(default)]
    pub y: Option<f64>,
    /// New scale multiplier.
    #[serde(default)]
    pub scale: Option<f64>,
    /// New rotation in degrees.
    #[serde(default)]
    pub rotation: Option<f64>,
}

impl TransformPatch {
    /// Patch that sets every field from `t`.
    pub fn all(t: DecalTransform) -> Self {
        Self {
            x: Some(t.x),
            y: Some(t.y),
            scale: Some(t.scale),
            rotation: Some(t.rotation),
        }
    }

    /// Return `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.scale.is_none() && self.rotation.is_none()
    }
}

/// Where and how large one image lands on a target surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// `min(target_w / image_w, target_h / image_h)`.
    pub fit_scale: f64,
    /// `fit_scale * transform.scale`.
    pub effective_scale: f64,
    /// Image center in target pixel coordinates.
    pub center: Point,
    /// Local frame: `translate(center) * rotate(rotation) * scale(effective_scale)`.
    ///
    /// The image's own pixel grid maps into this frame centered at the origin.
    pub frame: Affine,
    /// Native image size.
    pub image_size: Vec2,
}

impl Placement {
    /// Compute the placement of an image of `image_size` pixels on `target`.
    pub fn compute(image_size: SurfaceSize, target: SurfaceSize, t: &DecalTransform) -> Self {
        let (iw, ih) = (image_size.w(), image_size.h());
        let fit_scale = (target.w() / iw).min(target.h() / ih);
        let effective_scale = fit_scale * t.scale;
        let center = Point::new((t.x + 0.5) * target.w(), (t.y + 0.5) * target.h());

        // Order matters: rotation and scale apply in the frame already moved to the center.
        let frame = Affine::translate(center.to_vec2())
            * Affine::rotate(deg_to_rad_wrapped(t.rotation))
            * Affine::scale(effective_scale);

        Self {
            fit_scale,
            effective_scale,
            center,
            frame,
            image_size: Vec2::new(iw, ih),
        }
    }

    /// Transform that maps the image rect `(0, 0, w, h)` onto the target, centered on
    /// [`Placement::center`].
    pub fn image_transform(&self) -> Affine {
        self.frame * Affine::translate(-self.image_size / 2.0)
    }

    /// The image's native bounds in the local frame, centered at the origin.
    pub fn local_bounds(&self) -> Rect {
        let half = self.image_size / 2.0;
        Rect::new(-half.x, -half.y, half.x, half.y)
    }

    /// Local bounds grown by `pad` on every side; the selection highlight outline.
    pub fn highlight_rect(&self, pad: f64) -> Rect {
        self.local_bounds().inflate(pad, pad)
    }

    /// Axis-aligned bounding box of the placed image in target pixels.
    pub fn target_bounds(&self) -> Rect {
        self.frame.transform_rect_bbox(self.local_bounds())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/transform.rs"]
mod tests;
