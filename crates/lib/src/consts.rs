//! Fixed names shared by the build pipeline and the runtime bootstrapper.
//!
//! Both halves only communicate through the filesystem, so every path
//! fragment they agree on lives here.

pub const APP_NAME: &str = "minipy";

/// Interpreter version directory name used under `app/lib/`.
pub const RUNTIME_VERSION: &str = "python3.11";

/// Name of the toolchain output inside the build directory.
pub const BINARY_NAME: &str = "mini_python";

/// Name the binary is installed under in the native-library directory.
///
/// Packaging only ships files matching `lib*.so` from the libs directory.
pub const INSTALLED_BINARY_NAME: &str = "libmini_python.so";

/// Primary translation unit written into the build directory.
pub const MAIN_SOURCE_NAME: &str = "mini_python.c";

/// Generated translation unit holding the embedded module table.
pub const MANIFEST_SOURCE_NAME: &str = "embedded_modules.c";

/// Directory (relative to the build dir) receiving staged module sources.
pub const STAGED_MODULES_DIR: &str = "modules";

/// Script file written at the writable root on every bootstrap.
pub const SCRIPT_NAME: &str = "script.py";

/// Bytecode cache tag of the bundled interpreter (`__pycache__/m.<tag>.pyc`).
pub const PYC_CACHE_TAG: &str = "cpython-311";

/// Compiled module whose presence proves the stdlib archive was extracted.
pub const STDLIB_SENTINEL: &str = "encodings/__init__.pyc";

/// Placeholder returned when the interpreter produced no output.
pub const NO_OUTPUT: &str = "No output.";

/// Environment variable naming the application-private writable root.
pub const FILES_DIR_ENV: &str = "MINIPY_FILES_DIR";

/// Environment variable naming the native-library directory.
pub const NATIVE_LIB_DIR_ENV: &str = "MINIPY_NATIVE_LIB_DIR";
