pub(crate) mod color;
pub mod decode;
