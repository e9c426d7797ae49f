//! uvdecal composites user-placed decal images onto the UV texture of a garment model.
//!
//! The core is a [`Compositor`]: an ordered stack of decal layers plus a fill color, rendered
//! by one shared paint routine into two passes:
//!
//! - the texture pass, at the reference template's resolution, bound to the garment through a
//!   [`TextureSink`]
//! - the preview pass, drawn over the template with a selection outline around the active layer
//!
//! [`Customizer`] wraps the compositor into an editor session that maps UI events (uploads,
//! selection, sliders, drag gestures, color picks, resizes) onto state updates followed by an
//! immediate re-render and texture bind.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

/// Layers, transforms and the compositor.
pub mod compose;
/// Garment model surfaces that receive textures.
pub mod model;
/// Drawing surfaces.
pub mod render;
/// Editor session.
pub mod session;
/// Texture sinks.
pub mod sink;

pub use crate::assets::decode::{
    DecodedImage, ImageId, Upload, decode_image, decode_svg, decode_upload, mime_for_path,
};
pub use crate::foundation::core::{
    Affine, Bitmap, Point, Rect, Rgb8, Rgba8Premul, SurfaceSize, Vec2,
};
pub use crate::foundation::error::{DecalError, DecalResult};

pub use crate::compose::compositor::{Compositor, HighlightStyle, Pass};
pub use crate::compose::stack::{Layer, LayerStack};
pub use crate::compose::transform::{DecalTransform, Placement, TransformPatch};
pub use crate::model::garment::{GarmentModel, MeshSurface};
pub use crate::render::cpu::CpuSurface;
pub use crate::render::surface::{DrawSurface, StrokeStyle};
pub use crate::session::customizer::{Customizer, GestureMode, PreviewLayout};
pub use crate::session::opts::{CustomizerOpts, DragOpts};
pub use crate::sink::texture::{InMemoryTextureSink, PngTextureSink, TextureSink, TextureUpdate};
