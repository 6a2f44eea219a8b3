//! Stages the bundled interpreter into a writable, executable location.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::platform::perms::{is_executable, make_executable};

use super::BootstrapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
  Copied,
  /// A previous launch already staged the binary.
  Reused,
}

/// Copy `bundled` to `staged` unless a copy is already there.
///
/// An existing copy is never re-copied; at most its execute bit is restored.
/// Only a regular file counts as a copy: a dangling link is replaced, and a
/// directory in the way is a staging error.
pub fn stage_interpreter(bundled: &Path, staged: &Path) -> Result<StageOutcome, BootstrapError> {
  if staged.is_file() {
    if !is_executable(staged) {
      make_executable(staged)?;
    }
    debug!(path = %staged.display(), "reusing staged interpreter");
    return Ok(StageOutcome::Reused);
  }

  if !bundled.is_file() {
    return Err(BootstrapError::MissingInterpreter {
      path: bundled.to_path_buf(),
    });
  }

  let dir = staged.parent().unwrap_or(Path::new("."));
  let copy_err = |source| BootstrapError::StageCopy {
    from: bundled.to_path_buf(),
    to: staged.to_path_buf(),
    source,
  };

  let tmp = tempfile::NamedTempFile::new_in(dir).map_err(copy_err)?;
  fs::copy(bundled, tmp.path()).map_err(copy_err)?;
  make_executable(tmp.path())?;
  tmp.persist(staged).map_err(|e| copy_err(e.error))?;

  info!(from = %bundled.display(), to = %staged.display(), "staged interpreter");
  Ok(StageOutcome::Copied)
}
