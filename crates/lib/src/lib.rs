//! minipy-lib: build pipeline and runtime bootstrapper for an embedded Python
//!
//! The crate is split along the two phases of the product:
//! - `probe`, `manifest`, `build`: build-time discovery of optional C modules,
//!   generation of the embedded module table, compilation and packaging
//! - `runtime`: on-device stdlib extraction, interpreter staging and launch
//!
//! The phases share nothing but the filesystem layout described in `consts`
//! and `platform::paths`.

pub mod build;
pub mod consts;
pub mod manifest;
pub mod platform;
pub mod probe;
pub mod runtime;
