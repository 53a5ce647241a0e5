//! Control layer exposing engine state to external tooling.

/// High-level status API for the engine.
pub mod api;
/// Ratatui-based developer console.
pub mod ui;
