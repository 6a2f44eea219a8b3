//! Interpreter build pipeline.
//!
//! One build produces one interpreter binary for one architecture plus the
//! stdlib bundle it needs. Steps run strictly in order and any fatal error
//! stops the pipeline before anything is installed.
//!
//! # Submodules
//!
//! - [`execute`] - The orchestrator function driving a build
//! - [`stdlib`] - Stdlib allow-list packaging and archive creation
//! - [`templates`] - Embedded C entry point
//! - [`toolchain`] - Compiler invocation seam

pub mod execute;
pub mod stdlib;
pub mod templates;
pub mod toolchain;
mod types;

pub use execute::{BuildOutput, install_binary, locate_core_library, run_build};
pub use toolchain::{CompileInvocation, SystemToolchain, Toolchain};
pub use types::*;
