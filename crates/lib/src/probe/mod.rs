//! Optional native module discovery.
//!
//! Scans an interpreter source tree's `Modules/` directory and decides which
//! optional extension modules can be compiled into the embedded binary. A
//! module whose sources are missing is dropped from the build rather than
//! failing it.
//!
//! # Submodules
//!
//! - [`catalog`] - The fixed list of optional modules and their candidate sources
//! - [`stage`] - Copies the chosen sources into the build directory

pub mod catalog;
pub mod stage;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

pub use catalog::{OPTIONAL_MODULES, OptionalModule, SourceCandidate};
pub use stage::{StageError, stage_module_sources};

/// Probe-time record of one optional module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
  /// Import name registered in the init table (e.g. `_struct`).
  pub name: &'static str,
  /// Preprocessor flag guarding the module's sources.
  pub feature_flag: &'static str,
  /// Initializer symbol exported by the module's sources.
  pub init_symbol: &'static str,
  /// Every candidate source set, in preference order.
  pub candidates: Vec<Vec<PathBuf>>,
  /// The candidate that matched, relative to the modules directory.
  pub chosen: Option<Vec<PathBuf>>,
}

impl ModuleDescriptor {
  pub fn is_available(&self) -> bool {
    self.chosen.is_some()
  }
}

/// Result of probing a source tree, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
  pub modules_dir: PathBuf,
  pub modules: Vec<ModuleDescriptor>,
}

impl ProbeResult {
  pub fn available(&self) -> impl Iterator<Item = &ModuleDescriptor> {
    self.modules.iter().filter(|m| m.is_available())
  }

  pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
    self.modules.iter().find(|m| m.name == name)
  }

  /// Feature flags of every available module, in catalog order.
  pub fn feature_flags(&self) -> Vec<&'static str> {
    self.available().map(|m| m.feature_flag).collect()
  }
}

/// Probe `modules_dir` against the built-in catalog.
pub fn probe_modules(modules_dir: &Path) -> ProbeResult {
  probe_with_catalog(modules_dir, OPTIONAL_MODULES)
}

/// Probe `modules_dir` against an explicit catalog.
///
/// The first candidate whose files all exist wins.
pub fn probe_with_catalog(modules_dir: &Path, catalog: &[OptionalModule]) -> ProbeResult {
  let modules = catalog
    .iter()
    .map(|module| {
      let candidates: Vec<Vec<PathBuf>> = module
        .candidates
        .iter()
        .map(|c| c.files.iter().map(PathBuf::from).collect())
        .collect();

      let chosen = candidates
        .iter()
        .find(|files| files.iter().all(|f| modules_dir.join(f).is_file()))
        .cloned();

      match &chosen {
        Some(files) => debug!(module = module.name, files = ?files, "optional module available"),
        None => info!(module = module.name, "optional module source not found, skipping"),
      }

      ModuleDescriptor {
        name: module.name,
        feature_flag: module.feature_flag,
        init_symbol: module.init_symbol,
        candidates,
        chosen,
      }
    })
    .collect();

  ProbeResult {
    modules_dir: modules_dir.to_path_buf(),
    modules,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "/* source */\n").unwrap();
  }

  #[test]
  fn empty_tree_marks_everything_unavailable() {
    let temp = TempDir::new().unwrap();
    let result = probe_modules(temp.path());

    assert_eq!(result.modules.len(), OPTIONAL_MODULES.len());
    assert_eq!(result.available().count(), 0);
    assert!(result.feature_flags().is_empty());
  }

  #[test]
  fn first_existing_candidate_wins() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "_struct.c");
    touch(temp.path(), "structmodule.c");

    let result = probe_modules(temp.path());
    let strukt = result.get("_struct").unwrap();
    assert_eq!(strukt.chosen, Some(vec![PathBuf::from("_struct.c")]));
  }

  #[test]
  fn falls_back_to_legacy_struct_source() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "structmodule.c");

    let result = probe_modules(temp.path());
    let strukt = result.get("_struct").unwrap();
    assert_eq!(strukt.chosen, Some(vec![PathBuf::from("structmodule.c")]));
    assert_eq!(strukt.feature_flag, "HAVE_STRUCT_MODULE");
  }

  #[test]
  fn multi_file_candidate_requires_every_file() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "_multiprocessing/multiprocessing.c");

    let result = probe_modules(temp.path());
    assert!(!result.get("_multiprocessing").unwrap().is_available());

    touch(temp.path(), "_multiprocessing/semaphore.c");
    let result = probe_modules(temp.path());
    assert!(result.get("_multiprocessing").unwrap().is_available());
  }

  #[test]
  fn directories_do_not_count_as_sources() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("selectmodule.c")).unwrap();

    let result = probe_modules(temp.path());
    assert!(!result.get("select").unwrap().is_available());
  }

  #[test]
  fn feature_flags_follow_catalog_order() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "selectmodule.c");
    touch(temp.path(), "_struct.c");

    let result = probe_modules(temp.path());
    assert_eq!(result.feature_flags(), vec!["HAVE_STRUCT_MODULE", "HAVE_SELECT"]);
  }
}
