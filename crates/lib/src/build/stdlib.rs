//! Standard-library packaging.
//!
//! Copies a fixed allow-list of pure-source modules into the bundle's
//! `site-packages` and makes sure a stdlib archive ships next to the
//! interpreter. The allow-list covers what the embedded optional modules
//! need at import time; `multiprocessing` in particular pulls in several
//! pure-source dependencies.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::consts::{PYC_CACHE_TAG, STDLIB_SENTINEL};

/// Modules copied into site-packages: packages (directories) and leaf modules.
pub const STDLIB_ALLOW_LIST: &[&str] = &[
  "encodings",
  "collections",
  "os.py",
  "sys.py",
  "types.py",
  "io.py",
  "abc.py",
  "functools.py",
  "operator.py",
  "keyword.py",
  "heapq.py",
  "reprlib.py",
  "weakref.py",
  "multiprocessing",
  "pickle.py",
  "copyreg.py",
  "threading.py",
  "signal.py",
  "selectors.py",
  "subprocess.py",
  "traceback.py",
];

/// Directory names never packed into a generated archive.
const ARCHIVE_EXCLUDES: &[&str] = &["test", "tests"];

const BYTECODE_CACHE_DIR: &str = "__pycache__";

#[derive(Debug, Error)]
pub enum StdlibError {
  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  #[error("failed to remove stale copy {}: {source}", path.display())]
  RemoveStale { path: PathBuf, source: io::Error },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    source: io::Error,
  },

  #[error("failed to traverse {}: {source}", path.display())]
  WalkDir { path: PathBuf, source: walkdir::Error },

  #[error("refusing to archive {}: no {sentinel} after bytecode layout", stdlib_dir.display())]
  MissingSentinel {
    stdlib_dir: PathBuf,
    sentinel: &'static str,
  },

  #[error("failed to write archive {}: {source}", path.display())]
  Archive {
    path: PathBuf,
    source: zip::result::ZipError,
  },
}

/// What happened to the stdlib archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ArchiveStatus {
  AlreadyPresent,
  CopiedPrebuilt { from: PathBuf },
  Built { entries: usize },
  /// Nothing to build it from; the runtime will run without extracted stdlib.
  Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageReport {
  pub copied: Vec<String>,
  pub skipped: Vec<String>,
}

/// Copy the allow-listed modules from `stdlib_dir` into `site_packages`.
///
/// Directory-shaped modules replace any previous copy. Missing modules, or a
/// missing stdlib tree altogether, are logged and skipped.
pub fn package_stdlib(stdlib_dir: &Path, site_packages: &Path) -> Result<PackageReport, StdlibError> {
  package_modules(stdlib_dir, site_packages, STDLIB_ALLOW_LIST)
}

pub fn package_modules(stdlib_dir: &Path, site_packages: &Path, modules: &[&str]) -> Result<PackageReport, StdlibError> {
  let mut report = PackageReport::default();

  if !stdlib_dir.is_dir() {
    warn!(path = %stdlib_dir.display(), "interpreter stdlib not found, skipping site-packages");
    report.skipped = modules.iter().map(|m| m.to_string()).collect();
    return Ok(report);
  }

  fs::create_dir_all(site_packages).map_err(|e| StdlibError::CreateDir {
    path: site_packages.to_path_buf(),
    source: e,
  })?;

  for module in modules {
    let src = stdlib_dir.join(module);
    let dst = site_packages.join(module);

    if src.is_dir() {
      if dst.exists() {
        fs::remove_dir_all(&dst).map_err(|e| StdlibError::RemoveStale {
          path: dst.clone(),
          source: e,
        })?;
      }
      copy_tree(&src, &dst)?;
    } else if src.is_file() {
      fs::copy(&src, &dst).map_err(|e| StdlibError::Copy {
        from: src.clone(),
        to: dst.clone(),
        source: e,
      })?;
    } else {
      warn!(module = %module, "stdlib module not found, skipping");
      report.skipped.push(module.to_string());
      continue;
    }

    debug!(module = %module, "copied to site-packages");
    report.copied.push(module.to_string());
  }

  info!(
    copied = report.copied.len(),
    skipped = report.skipped.len(),
    "packaged stdlib modules"
  );
  Ok(report)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), StdlibError> {
  for entry in WalkDir::new(src).sort_by_file_name() {
    let entry = entry.map_err(|e| StdlibError::WalkDir {
      path: src.to_path_buf(),
      source: e,
    })?;
    let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(rel);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(|e| StdlibError::CreateDir {
        path: target.clone(),
        source: e,
      })?;
    } else {
      fs::copy(entry.path(), &target).map_err(|e| StdlibError::Copy {
        from: entry.path().to_path_buf(),
        to: target.clone(),
        source: e,
      })?;
    }
  }
  Ok(())
}

/// Make sure `archive` exists.
///
/// An existing archive is left untouched. Otherwise `prebuilt` is copied in
/// when it exists, else `stdlib_dir` is zipped.
pub fn ensure_stdlib_archive(
  archive: &Path,
  prebuilt: Option<&Path>,
  stdlib_dir: &Path,
) -> Result<ArchiveStatus, StdlibError> {
  if archive.is_file() {
    debug!(path = %archive.display(), "stdlib archive already present");
    return Ok(ArchiveStatus::AlreadyPresent);
  }

  if let Some(parent) = archive.parent() {
    fs::create_dir_all(parent).map_err(|e| StdlibError::CreateDir {
      path: parent.to_path_buf(),
      source: e,
    })?;
  }

  if let Some(prebuilt) = prebuilt.filter(|p| p.is_file()) {
    fs::copy(prebuilt, archive).map_err(|e| StdlibError::Copy {
      from: prebuilt.to_path_buf(),
      to: archive.to_path_buf(),
      source: e,
    })?;
    info!(from = %prebuilt.display(), "copied prebuilt stdlib archive");
    return Ok(ArchiveStatus::CopiedPrebuilt {
      from: prebuilt.to_path_buf(),
    });
  }

  if !stdlib_dir.is_dir() {
    warn!(path = %stdlib_dir.display(), "no stdlib source to archive");
    return Ok(ArchiveStatus::Unavailable);
  }

  let entries = write_archive(stdlib_dir, archive)?;
  info!(path = %archive.display(), entries, "built stdlib archive");
  Ok(ArchiveStatus::Built { entries })
}

fn write_archive(stdlib_dir: &Path, archive: &Path) -> Result<usize, StdlibError> {
  let plan = plan_archive(stdlib_dir)?;
  if !plan.contains_key(STDLIB_SENTINEL) {
    return Err(StdlibError::MissingSentinel {
      stdlib_dir: stdlib_dir.to_path_buf(),
      sentinel: STDLIB_SENTINEL,
    });
  }

  let archive_err = |source| StdlibError::Archive {
    path: archive.to_path_buf(),
    source,
  };

  // Write next to the destination so a failure never leaves a truncated archive.
  let parent = archive.parent().unwrap_or(Path::new("."));
  let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StdlibError::CreateDir {
    path: parent.to_path_buf(),
    source: e,
  })?;

  let options = SimpleFileOptions::default()
    .compression_method(zip::CompressionMethod::Deflated)
    .last_modified_time(zip::DateTime::default());
  let mut writer = zip::ZipWriter::new(tmp.as_file());

  for (name, source) in &plan {
    match source {
      None => writer.add_directory(format!("{}/", name), options).map_err(archive_err)?,
      Some(path) => {
        writer.start_file(name.as_str(), options).map_err(archive_err)?;
        let copy_err = |e| StdlibError::Copy {
          from: path.clone(),
          to: archive.to_path_buf(),
          source: e,
        };
        let file = File::open(path).map_err(copy_err)?;
        io::copy(&mut BufReader::new(file), &mut writer).map_err(copy_err)?;
      }
    }
  }

  writer.finish().map_err(archive_err)?;
  tmp.persist(archive).map_err(|e| StdlibError::Copy {
    from: e.file.path().to_path_buf(),
    to: archive.to_path_buf(),
    source: e.error,
  })?;
  Ok(plan.len())
}

/// Archive entry names mapped to their source file (`None` for directories).
///
/// Cached bytecode is stored beside its module (`pkg/__pycache__/m.<tag>.pyc`
/// becomes `pkg/m.pyc`) so the extracted tree imports without the sources and
/// carries the extraction sentinel. Bytecode for other interpreter versions or
/// optimization levels is dropped.
fn plan_archive(stdlib_dir: &Path) -> Result<BTreeMap<String, Option<PathBuf>>, StdlibError> {
  let mut plan = BTreeMap::new();

  let walker = WalkDir::new(stdlib_dir)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| {
      e.file_name()
        .to_str()
        .map(|name| !(e.file_type().is_dir() && ARCHIVE_EXCLUDES.contains(&name)))
        .unwrap_or(true)
    });

  for entry in walker {
    let entry = entry.map_err(|e| StdlibError::WalkDir {
      path: stdlib_dir.to_path_buf(),
      source: e,
    })?;
    let rel = entry.path().strip_prefix(stdlib_dir).unwrap_or(entry.path());
    let mut parts: Vec<String> = rel
      .components()
      .map(|c| c.as_os_str().to_string_lossy().into_owned())
      .collect();

    let in_cache = parts.len() >= 2 && parts[parts.len() - 2] == BYTECODE_CACHE_DIR;
    let is_cache_dir = parts.last().is_some_and(|p| p == BYTECODE_CACHE_DIR);

    if entry.file_type().is_dir() {
      if !is_cache_dir {
        plan.insert(parts.join("/"), None);
      }
      continue;
    }

    if in_cache {
      let Some(module) = parts.last().and_then(|file| legacy_bytecode_name(file)) else {
        continue;
      };
      let len = parts.len();
      parts.truncate(len - 2);
      parts.push(module);
    }
    plan.entry(parts.join("/")).or_insert(Some(entry.path().to_path_buf()));
  }

  Ok(plan)
}

/// `m.cpython-311.pyc` -> `m.pyc`; `None` for any other cache tag.
fn legacy_bytecode_name(file: &str) -> Option<String> {
  let stem = file.strip_suffix(&format!(".{}.pyc", PYC_CACHE_TAG))?;
  Some(format!("{}.pyc", stem))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  #[test]
  fn copies_packages_and_leaf_modules() {
    let lib = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();
    write(lib.path(), "encodings/__init__.py", "# enc");
    write(lib.path(), "encodings/utf_8.py", "# utf8");
    write(lib.path(), "os.py", "# os");
    write(lib.path(), "not_listed.py", "# nope");

    let report = package_modules(lib.path(), site.path(), &["encodings", "os.py"]).unwrap();

    assert_eq!(report.copied, vec!["encodings", "os.py"]);
    assert!(report.skipped.is_empty());
    assert_eq!(
      fs::read_to_string(site.path().join("encodings/utf_8.py")).unwrap(),
      "# utf8"
    );
    assert!(site.path().join("os.py").is_file());
    assert!(!site.path().join("not_listed.py").exists());
  }

  #[test]
  fn replaces_stale_package_directory() {
    let lib = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();
    write(lib.path(), "collections/__init__.py", "# fresh");
    write(site.path(), "collections/stale.py", "# stale");

    package_modules(lib.path(), site.path(), &["collections"]).unwrap();

    assert!(!site.path().join("collections/stale.py").exists());
    assert_eq!(
      fs::read_to_string(site.path().join("collections/__init__.py")).unwrap(),
      "# fresh"
    );
  }

  #[test]
  #[traced_test]
  fn missing_module_is_skipped_not_fatal() {
    let lib = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();
    write(lib.path(), "abc.py", "");

    let report = package_modules(lib.path(), site.path(), &["abc.py", "heapq.py"]).unwrap();

    assert_eq!(report.copied, vec!["abc.py"]);
    assert_eq!(report.skipped, vec!["heapq.py"]);
    assert!(logs_contain("stdlib module not found"));
  }

  #[test]
  fn missing_stdlib_tree_skips_everything() {
    let temp = TempDir::new().unwrap();
    let report = package_stdlib(&temp.path().join("Lib"), &temp.path().join("site")).unwrap();

    assert!(report.copied.is_empty());
    assert_eq!(report.skipped.len(), STDLIB_ALLOW_LIST.len());
    assert!(!temp.path().join("site").exists());
  }

  #[test]
  fn existing_archive_is_left_alone() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("stdlib.zip");
    fs::write(&archive, b"existing").unwrap();

    let status = ensure_stdlib_archive(&archive, None, &temp.path().join("Lib")).unwrap();

    assert_eq!(status, ArchiveStatus::AlreadyPresent);
    assert_eq!(fs::read(&archive).unwrap(), b"existing");
  }

  #[test]
  fn prebuilt_archive_is_copied() {
    let temp = TempDir::new().unwrap();
    let prebuilt = temp.path().join("prebuilt.zip");
    fs::write(&prebuilt, b"zipbytes").unwrap();
    let archive = temp.path().join("bundle/stdlib.zip");

    let status = ensure_stdlib_archive(&archive, Some(&prebuilt), &temp.path().join("Lib")).unwrap();

    assert_eq!(status, ArchiveStatus::CopiedPrebuilt { from: prebuilt });
    assert_eq!(fs::read(&archive).unwrap(), b"zipbytes");
  }

  #[test]
  fn builds_archive_from_stdlib_tree() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("Lib");
    write(&lib, "encodings/__init__.py", "# enc");
    write(&lib, "encodings/__pycache__/__init__.cpython-311.pyc", "bytecode");
    write(&lib, "encodings/__pycache__/__init__.cpython-311.opt-2.pyc", "optimized");
    write(&lib, "encodings/__pycache__/__init__.cpython-312.pyc", "other version");
    write(&lib, "test/test_os.py", "# excluded");
    write(&lib, "os.py", "# os");
    let archive = temp.path().join("bundle/stdlib.zip");

    let status = ensure_stdlib_archive(&archive, None, &lib).unwrap();

    assert_eq!(status, ArchiveStatus::Built { entries: 4 });
    let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
      names,
      vec!["encodings/", "encodings/__init__.py", "encodings/__init__.pyc", "os.py"]
    );
    let mut content = String::new();
    io::Read::read_to_string(&mut zip.by_name("encodings/__init__.pyc").unwrap(), &mut content).unwrap();
    assert_eq!(content, "bytecode");
  }

  #[test]
  fn refuses_archive_without_compiled_encodings() {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("Lib");
    write(&lib, "encodings/__init__.py", "# enc");
    write(&lib, "os.py", "# os");
    let archive = temp.path().join("bundle/stdlib.zip");

    let err = ensure_stdlib_archive(&archive, None, &lib).unwrap_err();

    assert!(matches!(err, StdlibError::MissingSentinel { .. }));
    assert!(!archive.exists());
  }

  #[test]
  fn built_archive_is_extracted_only_once() {
    use crate::runtime::extract::{ExtractOutcome, extract_stdlib_if_needed, sentinel_path};

    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("Lib");
    write(&lib, "encodings/__init__.py", "# enc");
    write(&lib, "encodings/__pycache__/__init__.cpython-311.pyc", "bytecode");
    write(&lib, "os.py", "# os");
    let archive = temp.path().join("bundle/stdlib.zip");
    let target = temp.path().join("app/lib/python3.11");
    ensure_stdlib_archive(&archive, None, &lib).unwrap();

    let first = extract_stdlib_if_needed(&archive, &target);
    let second = extract_stdlib_if_needed(&archive, &target);

    assert_eq!(first, ExtractOutcome::Extracted { entries: 4 });
    assert!(sentinel_path(&target).is_file());
    assert_eq!(second, ExtractOutcome::AlreadyExtracted);
  }

  #[test]
  fn nothing_to_archive_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let status = ensure_stdlib_archive(&temp.path().join("stdlib.zip"), None, &temp.path().join("Lib")).unwrap();
    assert_eq!(status, ArchiveStatus::Unavailable);
  }
}
