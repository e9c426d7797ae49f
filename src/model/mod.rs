//! Garment model side of the texture bind.

/// UV-mapped mesh surfaces that display the rendered texture.
pub mod garment;
