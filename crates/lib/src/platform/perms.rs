//! Executable permission handling for the interpreter binary.
//!
//! Both the build-time install and the runtime staging copy need the same
//! 0755 mode. On non-Unix hosts there is no executable bit to set.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PermsError {
  #[error("failed to read metadata for {path}: {source}")]
  Metadata {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to set permissions on {path}: {source}")]
  SetPermissions {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// Set mode 0755 on `path`.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<(), PermsError> {
  use std::os::unix::fs::PermissionsExt;

  let metadata = std::fs::metadata(path).map_err(|e| PermsError::Metadata {
    path: path.display().to_string(),
    source: e,
  })?;

  let mut perms = metadata.permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(path, perms).map_err(|e| PermsError::SetPermissions {
    path: path.display().to_string(),
    source: e,
  })
}

#[cfg(not(unix))]
pub fn make_executable(path: &Path) -> Result<(), PermsError> {
  std::fs::metadata(path).map(|_| ()).map_err(|e| PermsError::Metadata {
    path: path.display().to_string(),
    source: e,
  })
}

/// Whether `path` is a regular file with any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  std::fs::metadata(path)
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
  path.is_file()
}
