//! Layer model and the compositor that rasterizes it.

/// `Compositor`, render passes and the highlight style.
pub mod compositor;
/// `Layer` and `LayerStack`.
pub mod stack;
/// Decal transforms and the placement algorithm.
pub mod transform;
