use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::{Bitmap, Rgb8};
use crate::foundation::error::DecalResult;

/// One rendered texture handed to a sink.
#[derive(Clone, Debug)]
pub struct TextureUpdate {
    /// The freshly rendered texture. Never mutated after the bind.
    pub texture: Arc<Bitmap>,
    /// Garment fill color the texture was rendered with.
    pub fill: Rgb8,
    /// Monotonic render counter of the producing session, starting at 1.
    pub revision: u64,
}

/// Destination for rendered textures.
///
/// Each bind replaces the previous texture wholesale; sinks must not assume they see every
/// revision.
pub trait TextureSink {
    /// Accept a newly rendered texture.
    fn bind(&mut self, update: TextureUpdate) -> DecalResult<()>;
}

impl<T: TextureSink + ?Sized> TextureSink for Box<T> {
    fn bind(&mut self, update: TextureUpdate) -> DecalResult<()> {
        (**self).bind(update)
    }
}

/// Sink that keeps the latest texture in memory, for tests and headless use.
#[derive(Debug, Default)]
pub struct InMemoryTextureSink {
    latest: Option<TextureUpdate>,
    binds: u64,
}

impl InMemoryTextureSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent update, if any.
    pub fn latest(&self) -> Option<&TextureUpdate> {
        self.latest.as_ref()
    }

    /// Number of binds received.
    pub fn bind_count(&self) -> u64 {
        self.binds
    }
}

impl TextureSink for InMemoryTextureSink {
    fn bind(&mut self, update: TextureUpdate) -> DecalResult<()> {
        self.binds += 1;
        self.latest = Some(update);
        Ok(())
    }
}

/// Sink that writes every bound texture to one PNG file, overwriting it.
#[derive(Clone, Debug)]
pub struct PngTextureSink {
    path: PathBuf,
    written: u64,
}

impl PngTextureSink {
    /// Write to `path`; parent directories are created on the first bind.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    /// Output path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Number of files written.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl TextureSink for PngTextureSink {
    fn bind(&mut self, update: TextureUpdate) -> DecalResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let img = update.texture.to_rgba_image()?;
        img.save(&self.path)
            .with_context(|| format!("write png '{}'", self.path.display()))?;
        self.written += 1;
        tracing::debug!(
            path = %self.path.display(),
            revision = update.revision,
            "wrote texture png"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sink/texture.rs"]
mod tests;
