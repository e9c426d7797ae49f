//! Hex color text, as written on the command line and in option files.

use serde::Deserialize;

use crate::foundation::core::{Rgb8, Rgba8Premul};
use crate::foundation::error::{DecalError, DecalResult};

/// Straight-alpha color parsed from `#rrggbb` or `#rrggbbaa`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HexColor {
    pub(crate) rgb: Rgb8,
    pub(crate) alpha: u8,
}

impl HexColor {
    pub(crate) fn is_opaque(self) -> bool {
        self.alpha == u8::MAX
    }

    pub(crate) fn to_premul(self) -> Rgba8Premul {
        Rgba8Premul::from_straight_rgba(self.rgb.r, self.rgb.g, self.rgb.b, self.alpha)
    }
}

/// Parse `#rrggbb` or `#rrggbbaa`. The `#` is optional and case is ignored.
pub(crate) fn parse_hex(text: &str) -> DecalResult<HexColor> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !matches!(digits.len(), 6 | 8) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecalError::invalid_input(format!(
            "invalid color '{text}', expected #rrggbb or #rrggbbaa"
        )));
    }

    let mut channels = [u8::MAX; 4];
    for (channel, pair) in channels.iter_mut().zip(digits.as_bytes().chunks(2)) {
        *channel = (hex_nibble(pair[0]) << 4) | hex_nibble(pair[1]);
    }
    let [r, g, b, alpha] = channels;
    Ok(HexColor {
        rgb: Rgb8::new(r, g, b),
        alpha,
    })
}

fn hex_nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

/// Opaque fill colors only; an alpha byte other than `ff` is rejected.
pub(crate) fn parse_fill(text: &str) -> DecalResult<Rgb8> {
    let color = parse_hex(text)?;
    if !color.is_opaque() {
        return Err(DecalError::invalid_input(format!(
            "fill color '{text}' must be opaque"
        )));
    }
    Ok(color.rgb)
}

impl TryFrom<String> for Rgb8 {
    type Error = DecalError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        parse_fill(&text)
    }
}

impl From<Rgb8> for String {
    fn from(color: Rgb8) -> Self {
        color.to_hex()
    }
}

/// `deserialize_with` target for premultiplied colors given as hex text.
pub(crate) fn deserialize_premul<'de, D>(deserializer: D) -> Result<Rgba8Premul, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_hex(&text)
        .map(HexColor::to_premul)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
