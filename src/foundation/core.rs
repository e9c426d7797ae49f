use crate::foundation::error::{DecalError, DecalResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Pixel dimensions of a drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SurfaceSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceSize {
    /// Create a validated size; both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> DecalResult<Self> {
        if width == 0 || height == 0 {
            return Err(DecalError::validation(format!(
                "surface size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Width as `f64`.
    pub fn w(self) -> f64 {
        f64::from(self.width)
    }

    /// Height as `f64`.
    pub fn h(self) -> f64 {
        f64::from(self.height)
    }

    /// Full-surface rectangle in pixel space.
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.w(), self.h())
    }

    /// Total number of bytes for a tightly packed RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Opaque 8-bit RGB color, used for the garment fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Pure white, the default garment fill.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Build a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque premultiplied form.
    pub fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul {
            r: self.r,
            g: self.g,
            b: self.b,
            a: 255,
        }
    }

    /// `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Rgb8 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::str::FromStr for Rgb8 {
    type Err = DecalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::assets::color::parse_fill(s)
    }
}

impl std::fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        use crate::foundation::math::mul_div255_u8;

        Self {
            r: mul_div255_u8(u16::from(r), u16::from(a)),
            g: mul_div255_u8(u16::from(g), u16::from(a)),
            b: mul_div255_u8(u16::from(b), u16::from(a)),
            a,
        }
    }

    /// Channels as an array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A rendered bitmap as premultiplied RGBA8 pixels, tightly packed and row-major.
///
/// Bitmaps handed to texture sinks are never mutated after rendering; every render produces a
/// new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Wrap premultiplied bytes, checking the length against the size.
    pub fn from_premul(size: SurfaceSize, data: Vec<u8>) -> DecalResult<Self> {
        if data.len() != size.rgba8_len() {
            return Err(DecalError::validation(format!(
                "bitmap byte length {} does not match {}x{}",
                data.len(),
                size.width,
                size.height
            )));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
        })
    }

    /// Fully transparent bitmap.
    pub fn transparent(size: SurfaceSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            data: vec![0; size.rgba8_len()],
        }
    }

    /// Dimensions of this bitmap.
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Return `true` if every pixel equals `px`.
    pub fn is_uniform(&self, px: [u8; 4]) -> bool {
        self.data.chunks_exact(4).all(|p| p == px)
    }

    /// Stable content hash over dimensions and pixel bytes.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::with_capacity(8 + self.data.len());
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.data);
        xxhash_rust::xxh3::xxh3_64(&buf)
    }

    /// Convert into a straight-alpha `image` buffer, e.g. for PNG output.
    pub fn to_rgba_image(&self) -> DecalResult<image::RgbaImage> {
        let mut straight = self.data.clone();
        crate::foundation::math::unpremultiply_rgba8_in_place(&mut straight);
        image::RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| DecalError::validation("bitmap buffer does not match its dimensions"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
