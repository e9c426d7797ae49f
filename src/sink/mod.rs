//! Texture sinks.
//!
//! Sinks receive every texture the editor session renders, in render order.

/// Sink trait and the built-in in-memory and PNG sinks.
pub mod texture;
