//! Runtime filesystem layout.
//!
//! Every path the bootstrapper touches is derived from two directories the
//! host platform hands us: the application-private writable root and the
//! directory the package manager unpacked native libraries into.
//!
//! ```text
//! <files_dir>/
//! ├── app/
//! │   ├── _python_bundle/stdlib.zip
//! │   ├── _python_bundle/site-packages/
//! │   └── lib/python3.11/            # extraction target
//! │       └── lib-dynload/
//! ├── script.py
//! └── mini_python                    # staged executable
//! <native_lib_dir>/libmini_python.so
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::{
  BINARY_NAME, FILES_DIR_ENV, INSTALLED_BINARY_NAME, NATIVE_LIB_DIR_ENV, RUNTIME_VERSION, SCRIPT_NAME,
};

#[derive(Debug, Error)]
pub enum LayoutError {
  #[error("{var} is not set; cannot locate the {what}")]
  MissingVar { var: &'static str, what: &'static str },
}

/// Resolved runtime paths for one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
  files_dir: PathBuf,
  native_lib_dir: PathBuf,
}

impl RuntimeLayout {
  pub fn new(files_dir: impl Into<PathBuf>, native_lib_dir: impl Into<PathBuf>) -> Self {
    Self {
      files_dir: files_dir.into(),
      native_lib_dir: native_lib_dir.into(),
    }
  }

  /// Build the layout from `MINIPY_FILES_DIR` and `MINIPY_NATIVE_LIB_DIR`.
  pub fn from_env() -> Result<Self, LayoutError> {
    Self::resolve(None, None)
  }

  /// Use the given directories, falling back to the environment for any
  /// that are `None`.
  pub fn resolve(files_dir: Option<PathBuf>, native_lib_dir: Option<PathBuf>) -> Result<Self, LayoutError> {
    let files_dir = match files_dir {
      Some(dir) => dir,
      None => std::env::var_os(FILES_DIR_ENV)
        .map(PathBuf::from)
        .ok_or(LayoutError::MissingVar {
          var: FILES_DIR_ENV,
          what: "writable root",
        })?,
    };
    let native_lib_dir = match native_lib_dir {
      Some(dir) => dir,
      None => std::env::var_os(NATIVE_LIB_DIR_ENV)
        .map(PathBuf::from)
        .ok_or(LayoutError::MissingVar {
          var: NATIVE_LIB_DIR_ENV,
          what: "native library directory",
        })?,
    };
    Ok(Self::new(files_dir, native_lib_dir))
  }

  pub fn files_dir(&self) -> &Path {
    &self.files_dir
  }

  pub fn native_lib_dir(&self) -> &Path {
    &self.native_lib_dir
  }

  /// Interpreter home (`<files>/app`).
  pub fn app_dir(&self) -> PathBuf {
    self.files_dir.join("app")
  }

  pub fn app_lib_dir(&self) -> PathBuf {
    self.app_dir().join("lib")
  }

  pub fn bundle_dir(&self) -> PathBuf {
    self.app_dir().join("_python_bundle")
  }

  pub fn stdlib_archive(&self) -> PathBuf {
    self.bundle_dir().join("stdlib.zip")
  }

  pub fn site_packages_dir(&self) -> PathBuf {
    self.bundle_dir().join("site-packages")
  }

  /// Directory the stdlib archive is extracted into.
  pub fn stdlib_dir(&self) -> PathBuf {
    self.app_lib_dir().join(RUNTIME_VERSION)
  }

  pub fn dynload_dir(&self) -> PathBuf {
    self.stdlib_dir().join("lib-dynload")
  }

  pub fn script_path(&self) -> PathBuf {
    self.files_dir.join(SCRIPT_NAME)
  }

  /// Bundled interpreter as installed by the package manager.
  pub fn bundled_interpreter(&self) -> PathBuf {
    self.native_lib_dir.join(INSTALLED_BINARY_NAME)
  }

  /// Writable, executable copy the child process is launched from.
  pub fn staged_interpreter(&self) -> PathBuf {
    self.files_dir.join(BINARY_NAME)
  }

  pub fn temp_dir(&self) -> &Path {
    &self.files_dir
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn derives_runtime_paths_from_files_dir() {
    let layout = RuntimeLayout::new("/data/files", "/data/app/lib/arm64");

    assert_eq!(layout.stdlib_archive(), PathBuf::from("/data/files/app/_python_bundle/stdlib.zip"));
    assert_eq!(layout.stdlib_dir(), PathBuf::from("/data/files/app/lib/python3.11"));
    assert_eq!(layout.script_path(), PathBuf::from("/data/files/script.py"));
    assert_eq!(layout.staged_interpreter(), PathBuf::from("/data/files/mini_python"));
    assert_eq!(
      layout.bundled_interpreter(),
      PathBuf::from("/data/app/lib/arm64/libmini_python.so")
    );
  }

  #[test]
  #[serial]
  fn from_env_reads_both_directories() {
    temp_env::with_vars(
      [
        (FILES_DIR_ENV, Some("/custom/files")),
        (NATIVE_LIB_DIR_ENV, Some("/custom/native")),
      ],
      || {
        let layout = RuntimeLayout::from_env().unwrap();
        assert_eq!(layout, RuntimeLayout::new("/custom/files", "/custom/native"));
      },
    );
  }

  #[test]
  #[serial]
  fn from_env_reports_missing_native_dir() {
    temp_env::with_vars(
      [(FILES_DIR_ENV, Some("/custom/files")), (NATIVE_LIB_DIR_ENV, None::<&str>)],
      || {
        let err = RuntimeLayout::from_env().unwrap_err();
        assert!(matches!(err, LayoutError::MissingVar { var: NATIVE_LIB_DIR_ENV, .. }));
      },
    );
  }

  #[test]
  #[serial]
  fn explicit_directories_override_environment() {
    temp_env::with_vars(
      [(FILES_DIR_ENV, Some("/env/files")), (NATIVE_LIB_DIR_ENV, None::<&str>)],
      || {
        let layout = RuntimeLayout::resolve(None, Some(PathBuf::from("/flag/native"))).unwrap();
        assert_eq!(layout, RuntimeLayout::new("/env/files", "/flag/native"));
      },
    );
  }
}
