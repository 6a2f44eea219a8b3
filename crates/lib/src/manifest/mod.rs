//! Embedding manifest generation.
//!
//! The manifest is a generated C translation unit that textually includes the
//! source of every available optional module and registers its initializer in
//! an `_inittab` extension table. It is built as a list of records and rendered
//! in one pass, so an initializer can only be referenced from inside the same
//! `#ifdef` guard that pulled in its source.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{APP_NAME, STAGED_MODULES_DIR};
use crate::probe::{ModuleDescriptor, ProbeResult};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to write manifest {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },
}

/// One guarded module block in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
  name: &'static str,
  feature_flag: &'static str,
  init_symbol: &'static str,
  includes: Vec<String>,
}

impl ManifestEntry {
  /// Returns `None` for a module whose sources were not found.
  fn from_descriptor(module: &ModuleDescriptor) -> Option<Self> {
    let files = module.chosen.as_ref()?;
    let includes = files
      .iter()
      .map(|rel| {
        let mut include = String::from(STAGED_MODULES_DIR);
        for component in rel.components() {
          include.push('/');
          include.push_str(&component.as_os_str().to_string_lossy());
        }
        include
      })
      .collect();

    Some(Self {
      name: module.name,
      feature_flag: module.feature_flag,
      init_symbol: module.init_symbol,
      includes,
    })
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn feature_flag(&self) -> &'static str {
    self.feature_flag
  }

  pub fn init_symbol(&self) -> &'static str {
    self.init_symbol
  }

  pub fn includes(&self) -> &[String] {
    &self.includes
  }
}

/// Generated embedding manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingManifest {
  entries: Vec<ManifestEntry>,
}

impl EmbeddingManifest {
  /// Build the manifest from a probe result, keeping catalog order.
  pub fn from_probe(probe: &ProbeResult) -> Self {
    Self {
      entries: probe.modules.iter().filter_map(ManifestEntry::from_descriptor).collect(),
    }
  }

  pub fn entries(&self) -> &[ManifestEntry] {
    &self.entries
  }

  /// Render the C source.
  pub fn render(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "/* Generated by {}. Do not edit. */", APP_NAME);
    out.push_str("#define PY_SSIZE_T_CLEAN\n");
    out.push_str("#include <Python.h>\n");

    for entry in &self.entries {
      out.push('\n');
      let _ = writeln!(out, "#ifdef {}", entry.feature_flag);
      for include in &entry.includes {
        let _ = writeln!(out, "#include \"{}\"", include);
      }
      out.push_str("#endif\n");
    }

    out.push_str("\nstatic struct _inittab embedded_modules[] = {\n");
    for entry in &self.entries {
      let _ = writeln!(out, "#ifdef {}", entry.feature_flag);
      let _ = writeln!(out, "    {{\"{}\", {}}},", entry.name, entry.init_symbol);
      out.push_str("#endif\n");
    }
    out.push_str("    {NULL, NULL}\n");
    out.push_str("};\n");

    out.push_str("\nint init_embedded_modules(void) {\n");
    out.push_str("    return PyImport_ExtendInittab(embedded_modules);\n");
    out.push_str("}\n");
    out
  }

  /// Render and write the manifest to `path`.
  pub fn write_to(&self, path: &Path) -> Result<(), ManifestError> {
    fs::write(path, self.render()).map_err(|e| ManifestError::Write {
      path: path.to_path_buf(),
      source: e,
    })?;
    debug!(path = %path.display(), modules = self.entries.len(), "wrote embedding manifest");
    Ok(())
  }
}
