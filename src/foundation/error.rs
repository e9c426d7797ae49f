/// Convenience result type used across uvdecal.
pub type DecalResult<T> = Result<T, DecalError>;

/// Top-level error taxonomy used by compositor and editor APIs.
///
/// Out-of-range layer indices are not errors: those requests are silent no-ops.
#[derive(thiserror::Error, Debug)]
pub enum DecalError {
    /// User-provided input of the wrong kind (non-image upload, malformed color or layer spec).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation ran before something it depends on was loaded.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// Invalid sizes or configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors raised while allocating or rasterizing a drawing surface.
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DecalError {
    /// Build a [`DecalError::InvalidInput`] value.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`DecalError::MissingPrerequisite`] value.
    pub fn missing_prerequisite(msg: impl Into<String>) -> Self {
        Self::MissingPrerequisite(msg.into())
    }

    /// Build a [`DecalError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DecalError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`DecalError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
