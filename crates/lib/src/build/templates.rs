//! Embedded C sources.

/// Interpreter entry point compiled together with the generated manifest.
pub const MAIN_SOURCE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/csrc/mini_python.c"));
