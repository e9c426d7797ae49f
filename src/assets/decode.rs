use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{DecalError, DecalResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Identity of a decoded image, used by surfaces to cache converted paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

fn next_image_id() -> ImageId {
    ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
}

/// A decoded raster in premultiplied RGBA8, immutable once built.
///
/// Layers hold these behind an `Arc`, so duplicating a layer shares the pixels.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    id: ImageId,
    /// Width in pixels, always >= 1.
    pub width: u32,
    /// Height in pixels, always >= 1.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl DecodedImage {
    /// Build from straight-alpha RGBA8 bytes.
    pub fn from_straight_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> DecalResult<Self> {
        let size = SurfaceSize::new(width, height)?;
        if rgba8.len() != size.rgba8_len() {
            return Err(DecalError::decode(format!(
                "rgba byte length {} does not match {width}x{height}",
                rgba8.len()
            )));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        Ok(Self::from_premul_unchecked(width, height, rgba8))
    }

    /// A single-color image, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DecalResult<Self> {
        let size = SurfaceSize::new(width, height)?;
        let data = rgba.repeat(size.rgba8_len() / 4);
        Self::from_straight_rgba8(width, height, data)
    }

    fn from_premul_unchecked(width: u32, height: u32, rgba8_premul: Vec<u8>) -> Self {
        Self {
            id: next_image_id(),
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        }
    }

    /// Process-unique identity of this decode.
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// Native size.
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Width as `f64`.
    pub fn w(&self) -> f64 {
        f64::from(self.width)
    }

    /// Height as `f64`.
    pub fn h(&self) -> f64 {
        f64::from(self.height)
    }
}

/// Decode encoded raster bytes (PNG, JPEG, WebP, ...) and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> DecalResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| DecalError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::from_straight_rgba8(width, height, rgba.into_raw())
}

/// Parse SVG bytes and rasterize them at their intrinsic size.
pub fn decode_svg(bytes: &[u8]) -> DecalResult<DecodedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| DecalError::decode(format!("parse svg tree: {e}")))?;

    let size = tree.size();
    let (w, h) = (size.width(), size.height());
    if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
        return Err(DecalError::decode("svg has invalid width/height"));
    }
    let width = (w.ceil() as u32).max(1);
    let height = (h.ceil() as u32).max(1);

    const MAX_DIM: u32 = 16_384;
    if width > MAX_DIM || height > MAX_DIM {
        return Err(DecalError::decode(format!(
            "svg raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| DecalError::decode("failed to allocate svg pixmap"))?;
    let xform =
        resvg::tiny_skia::Transform::from_scale((width as f32) / w, (height as f32) / h);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(DecodedImage::from_premul_unchecked(
        width,
        height,
        pixmap.data().to_vec(),
    ))
}

/// A user-provided file awaiting decode.
#[derive(Clone, Debug)]
pub struct Upload {
    /// Display name (usually the file name).
    pub name: String,
    /// MIME type as reported by the picker, e.g. `image/png`.
    pub mime: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload from its parts.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub fn from_path(path: &Path) -> DecalResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read upload '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    /// Return `true` if the MIME type names an image.
    pub fn is_image(&self) -> bool {
        self.mime.trim().to_ascii_lowercase().starts_with("image/")
    }

    fn is_svg(&self) -> bool {
        self.mime.trim().eq_ignore_ascii_case("image/svg+xml")
    }
}

/// Best-effort MIME type from a file extension; unknown extensions map to
/// `application/octet-stream`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Validate and decode an upload.
///
/// Non-image MIME types are rejected with [`DecalError::InvalidInput`] before any decode work.
pub fn decode_upload(upload: &Upload) -> DecalResult<DecodedImage> {
    if !upload.is_image() {
        return Err(DecalError::invalid_input(format!(
            "'{}' is not an image file ({})",
            upload.name, upload.mime
        )));
    }
    if upload.is_svg() {
        decode_svg(&upload.bytes)
    } else {
        decode_image(&upload.bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
