//! One-time stdlib archive extraction.
//!
//! Completion is recorded by the presence of a compiled `encodings` package
//! inside the target, so a finished extraction is never repeated and the
//! archive is not even opened.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::consts::STDLIB_SENTINEL;

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("io error extracting {}: {source}", path.display())]
  Io { path: PathBuf, source: std::io::Error },

  #[error("invalid archive {}: {source}", path.display())]
  Zip {
    path: PathBuf,
    source: zip::result::ZipError,
  },

  #[error("archive entry escapes the target directory: {name}")]
  UnsafeEntry { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
  /// The sentinel was present; nothing was read or written.
  AlreadyExtracted,
  Extracted { entries: usize },
  /// Extraction failed and was logged; imports may fail later.
  Failed { message: String },
}

pub fn sentinel_path(target: &Path) -> PathBuf {
  target.join(STDLIB_SENTINEL)
}

/// Extract `archive` into `target` unless the sentinel is already there.
///
/// Failures are logged and reported, never propagated.
pub fn extract_stdlib_if_needed(archive: &Path, target: &Path) -> ExtractOutcome {
  if sentinel_path(target).exists() {
    return ExtractOutcome::AlreadyExtracted;
  }

  match extract_zip(archive, target) {
    Ok(entries) => {
      info!(archive = %archive.display(), target = %target.display(), entries, "extracted stdlib archive");
      ExtractOutcome::Extracted { entries }
    }
    Err(e) => {
      error!(archive = %archive.display(), error = %e, "failed to extract stdlib archive");
      ExtractOutcome::Failed { message: e.to_string() }
    }
  }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, ExtractError> {
  let io_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source| ExtractError::Io { path, source }
  };

  let file = File::open(archive_path).map_err(io_err(archive_path))?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::Zip {
    path: archive_path.to_path_buf(),
    source: e,
  })?;

  fs::create_dir_all(dest).map_err(io_err(dest))?;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(|e| ExtractError::Zip {
      path: archive_path.to_path_buf(),
      source: e,
    })?;

    let rel = entry.enclosed_name().ok_or_else(|| ExtractError::UnsafeEntry {
      name: entry.name().to_string(),
    })?;
    let dest_path = dest.join(rel);

    if entry.is_dir() {
      fs::create_dir_all(&dest_path).map_err(io_err(&dest_path))?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut outfile = File::create(&dest_path).map_err(io_err(&dest_path))?;
    std::io::copy(&mut entry, &mut outfile).map_err(io_err(&dest_path))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(io_err(&dest_path))?;
      }
    }
  }

  Ok(archive.len())
}
