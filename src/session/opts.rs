use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::compose::compositor::{DEFAULT_DUPLICATE_OFFSET, HighlightStyle};
use crate::foundation::core::Rgb8;
use crate::foundation::error::{DecalError, DecalResult};

/// Pointer-drag sensitivities, per unit of normalized pointer travel.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DragOpts {
    /// Scale change per unit of `dx + dy`.
    pub scale_gain: f64,
    /// Rotation change in degrees per unit of `dx + dy`.
    pub rotate_gain_deg: f64,
}

impl Default for DragOpts {
    fn default() -> Self {
        Self {
            scale_gain: 2.0,
            rotate_gain_deg: 180.0,
        }
    }
}

/// Options for a [`crate::session::customizer::Customizer`].
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomizerOpts {
    /// Selection outline in the preview.
    pub highlight: HighlightStyle,
    /// Garment fill color before the user picks one.
    pub default_fill: Rgb8,
    /// Offset applied to both axes of a duplicated layer.
    pub duplicate_offset: f64,
    /// Drag gesture sensitivities.
    pub drag: DragOpts,
}

impl Default for CustomizerOpts {
    fn default() -> Self {
        Self {
            highlight: HighlightStyle::default(),
            default_fill: Rgb8::WHITE,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
            drag: DragOpts::default(),
        }
    }
}

impl CustomizerOpts {
    /// Parse and validate options from JSON text.
    pub fn from_json_str(s: &str) -> DecalResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| DecalError::validation(format!("parse customizer options JSON: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Parse and validate options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DecalResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            DecalError::validation(format!("open customizer options '{}': {e}", path.display()))
        })?;
        let opts: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            DecalError::validation(format!(
                "parse customizer options '{}': {e}",
                path.display()
            ))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject non-finite or negative sizes and gains.
    pub fn validate(&self) -> DecalResult<()> {
        let checks = [
            ("highlight.line_width", self.highlight.line_width),
            ("highlight.padding", self.highlight.padding),
            ("drag.scale_gain", self.drag.scale_gain),
            ("drag.rotate_gain_deg", self.drag.rotate_gain_deg),
        ];
        for (name, v) in checks {
            if !v.is_finite() || v < 0.0 {
                return Err(DecalError::validation(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if !self.duplicate_offset.is_finite() {
            return Err(DecalError::validation("duplicate_offset must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/opts.rs"]
mod tests;
