use std::sync::Arc;

use crate::assets::decode::{DecodedImage, ImageId};
use crate::compose::stack::{Layer, LayerStack};
use crate::compose::transform::{DecalTransform, Placement, TransformPatch};
use crate::foundation::core::{Affine, Bitmap, Rgb8, Rgba8Premul, SurfaceSize};
use crate::foundation::error::DecalResult;
use crate::render::cpu::CpuSurface;
use crate::render::surface::{DrawSurface, StrokeStyle};

/// Offset applied to both axes of a duplicated layer.
pub const DEFAULT_DUPLICATE_OFFSET: f64 = 0.1;

/// Selection outline drawn around the highlighted layer in the preview pass.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
pub struct HighlightStyle {
    /// Outline color.
    #[serde(
        default = "HighlightStyle::default_color",
        deserialize_with = "crate::assets::color::deserialize_premul"
    )]
    pub color: Rgba8Premul,
    /// Line width, in the layer's local (image pixel) units.
    #[serde(default = "HighlightStyle::default_line_width")]
    pub line_width: f64,
    /// Gap between the image bounds and the outline, in local units.
    #[serde(default = "HighlightStyle::default_padding")]
    pub padding: f64,
}

impl HighlightStyle {
    fn default_color() -> Rgba8Premul {
        Rgba8Premul {
            r: 0x21,
            g: 0x96,
            b: 0xf3,
            a: 0xff,
        }
    }

    fn default_line_width() -> f64 {
        2.0
    }

    fn default_padding() -> f64 {
        5.0
    }

    fn stroke(&self) -> StrokeStyle {
        StrokeStyle {
            color: self.color,
            width: self.line_width,
        }
    }
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: Self::default_color(),
            line_width: Self::default_line_width(),
            padding: Self::default_padding(),
        }
    }
}

/// Which of the two passes to paint.
#[derive(Clone, Copy)]
pub enum Pass<'a> {
    /// The texture bound to the garment: fill color, then layers.
    Texture,
    /// The editor preview: template stretched over the surface, then layers, plus the
    /// selection outline around `highlight` when it names a layer.
    Preview {
        /// Reference template drawn beneath the layers.
        template: &'a Arc<DecodedImage>,
        /// Layer to outline.
        highlight: Option<usize>,
    },
}

impl std::fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pass::Texture => f.write_str("Texture"),
            Pass::Preview {
                template,
                highlight,
            } => f
                .debug_struct("Preview")
                .field("template", &template.id())
                .field("highlight", highlight)
                .finish(),
        }
    }
}

/// Owns the decal layers and the garment fill color, and rasterizes them.
///
/// Rendering is a pure function of this state and the target surface size.
#[derive(Clone, Debug)]
pub struct Compositor {
    stack: LayerStack,
    fill: Rgb8,
    highlight: HighlightStyle,
    duplicate_offset: f64,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Rgb8::WHITE, HighlightStyle::default())
    }
}

impl Compositor {
    /// Empty compositor with the given fill and highlight style.
    pub fn new(fill: Rgb8, highlight: HighlightStyle) -> Self {
        Self {
            stack: LayerStack::new(),
            fill,
            highlight,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
        }
    }

    /// Override the duplicate offset.
    pub fn with_duplicate_offset(mut self, offset: f64) -> Self {
        self.duplicate_offset = offset;
        self
    }

    /// The layer stack.
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Current fill color.
    pub fn fill_color(&self) -> Rgb8 {
        self.fill
    }

    /// Current highlight style.
    pub fn highlight_style(&self) -> &HighlightStyle {
        &self.highlight
    }

    /// Append a layer and make it active.
    pub fn add_layer(&mut self, image: Arc<DecodedImage>, transform: DecalTransform) -> usize {
        self.stack.add_layer(image, transform)
    }

    /// Duplicate the active layer; `None` without one.
    pub fn duplicate_active(&mut self) -> Option<usize> {
        self.stack.duplicate_active(self.duplicate_offset)
    }

    /// Remove the layer at `index`; out-of-range indices are ignored.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        self.stack.remove_layer(index)
    }

    /// Select a layer; out-of-range indices are ignored.
    pub fn set_active(&mut self, index: usize) -> bool {
        self.stack.set_active(index)
    }

    /// Merge `patch` into the active layer; ignored without one.
    pub fn update_active_transform(&mut self, patch: &TransformPatch) -> bool {
        self.stack.update_active_transform(patch)
    }

    /// Replace the fill color. Returns whether it changed.
    pub fn set_fill_color(&mut self, color: Rgb8) -> bool {
        if self.fill == color {
            return false;
        }
        self.fill = color;
        true
    }

    /// Distinct images referenced by the stack.
    pub fn live_image_ids(&self) -> Vec<ImageId> {
        let mut ids: Vec<ImageId> = self.stack.layers().iter().map(|l| l.image.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Paint one pass onto `surface`, sized by the surface itself.
    ///
    /// Both passes go through this routine so the texture and the preview never drift apart.
    pub fn paint<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        pass: Pass<'_>,
    ) -> DecalResult<()> {
        let size = surface.size();
        surface.clear()?;

        let highlight = match pass {
            Pass::Texture => {
                surface.fill_rect(size.rect(), Affine::IDENTITY, self.fill.to_premul())?;
                None
            }
            Pass::Preview {
                template,
                highlight,
            } => {
                let stretch =
                    Affine::scale_non_uniform(size.w() / template.w(), size.h() / template.h());
                surface.draw_image(template, stretch)?;
                highlight.filter(|&i| i < self.stack.len())
            }
        };

        let stroke = self.highlight.stroke();
        for (i, layer) in self.stack.layers().iter().enumerate() {
            let placement = Placement::compute(layer.image.size(), size, &layer.transform);
            if highlight == Some(i) {
                let outline = placement.highlight_rect(self.highlight.padding);
                surface.stroke_rect(outline, placement.frame, &stroke)?;
            }
            surface.draw_image(&layer.image, placement.image_transform())?;
        }
        Ok(())
    }

    /// Paint `pass` and snapshot the result.
    #[tracing::instrument(level = "debug", skip(self, surface), fields(layers = self.stack.len()))]
    pub fn render<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        pass: Pass<'_>,
    ) -> DecalResult<Bitmap> {
        self.paint(surface, pass)?;
        surface.snapshot()
    }

    /// Render the texture pass on a fresh CPU surface of `size`.
    pub fn render_texture(&self, size: SurfaceSize) -> DecalResult<Bitmap> {
        let mut surface = CpuSurface::new(size)?;
        self.render(&mut surface, Pass::Texture)
    }

    /// Render the preview pass on a fresh CPU surface of `size`, outlining the active layer.
    pub fn render_preview(
        &self,
        size: SurfaceSize,
        template: &Arc<DecodedImage>,
    ) -> DecalResult<Bitmap> {
        let mut surface = CpuSurface::new(size)?;
        self.render(
            &mut surface,
            Pass::Preview {
                template,
                highlight: self.stack.active_index(),
            },
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
