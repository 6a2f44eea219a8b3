//! Process environment for the interpreter child.

use std::collections::BTreeMap;
use std::path::Path;

use crate::platform::paths::RuntimeLayout;

pub const HOME_VAR: &str = "PYTHONHOME";
pub const MODULE_PATH_VAR: &str = "PYTHONPATH";
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";
pub const TEMP_DIR_VAR: &str = "TMPDIR";

/// Variables applied on top of the inherited environment at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
  vars: BTreeMap<String, String>,
}

impl ProcessEnvironment {
  /// Build the environment for `layout`.
  ///
  /// The module path must match where the packager put site-packages and
  /// where the stdlib archive is extracted.
  pub fn for_layout(layout: &RuntimeLayout) -> Self {
    let module_path = join_paths(&[
      &layout.app_dir(),
      &layout.app_lib_dir(),
      &layout.stdlib_dir(),
      &layout.dynload_dir(),
      &layout.site_packages_dir(),
    ]);
    let library_path = join_paths(&[&layout.app_lib_dir(), layout.native_lib_dir()]);

    let mut vars = BTreeMap::new();
    vars.insert(HOME_VAR.to_string(), layout.app_dir().display().to_string());
    vars.insert(MODULE_PATH_VAR.to_string(), module_path);
    vars.insert(LIBRARY_PATH_VAR.to_string(), library_path);
    vars.insert(TEMP_DIR_VAR.to_string(), layout.temp_dir().display().to_string());
    Self { vars }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }
}

fn join_paths(paths: &[&Path]) -> String {
  paths
    .iter()
    .map(|p| p.display().to_string())
    .collect::<Vec<_>>()
    .join(":")
}
