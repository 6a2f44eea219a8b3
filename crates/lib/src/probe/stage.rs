//! Copies the sources of available optional modules into the build directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::ProbeResult;

#[derive(Debug, Error)]
pub enum StageError {
  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    source: std::io::Error,
  },
}

/// Copy every chosen source file into `dest`, preserving sub-directories.
///
/// Returns the staged paths in catalog order. Unavailable modules contribute
/// nothing.
pub fn stage_module_sources(probe: &ProbeResult, dest: &Path) -> Result<Vec<PathBuf>, StageError> {
  let mut staged = Vec::new();

  for module in probe.available() {
    let Some(files) = &module.chosen else { continue };

    for rel in files {
      let from = probe.modules_dir.join(rel);
      let to = dest.join(rel);

      if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| StageError::CreateDir {
          path: parent.to_path_buf(),
          source: e,
        })?;
      }

      fs::copy(&from, &to).map_err(|e| StageError::Copy {
        from: from.clone(),
        to: to.clone(),
        source: e,
      })?;

      debug!(module = module.name, file = %rel.display(), "staged module source");
      staged.push(to);
    }
  }

  Ok(staged)
}
