//! Editor session: turns UI events into compositor updates, renders and texture binds.

/// The `Customizer` session, gesture modes and preview layout.
pub mod customizer;
/// Session options and JSON config loading.
pub mod opts;
