//! Drawing surfaces.

/// `vello_cpu` raster surface.
pub mod cpu;
/// Draw-call recorder.
pub mod record;
/// The `DrawSurface` trait.
pub mod surface;
