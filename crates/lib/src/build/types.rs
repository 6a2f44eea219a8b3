//! Build configuration, compiler environment and errors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::ManifestError;
use crate::platform::arch::Arch;
use crate::platform::perms::PermsError;
use crate::probe::{ProbeResult, StageError};

use super::stdlib::StdlibError;

/// Link inputs every interpreter binary needs besides the core library.
pub const SYSTEM_LIBS: &[&str] = &["log", "android", "dl", "m", "z"];

/// Core library file names, most preferred first.
pub const CORE_LIBRARY_CANDIDATES: &[&str] = &["libpython3.11.a", "libpython3.11.so", "libpython3.so"];

pub const DEFAULT_CC: &str = "clang";

/// Errors loading a build configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("invalid config {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },
}

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// None of the core library candidates exist under the link root.
  #[error("could not find a linkable interpreter core library in {} (tried {})", link_root.display(), tried.join(", "))]
  CoreLibraryNotFound { link_root: PathBuf, tried: Vec<String> },

  #[error("failed to start toolchain {program}: {source}")]
  ToolchainSpawn { program: String, source: std::io::Error },

  #[error("toolchain {program} failed with exit code {code:?}")]
  ToolchainFailed { program: String, code: Option<i32> },

  #[error("toolchain reported success but produced no output at {}", path.display())]
  MissingOutput { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to install {} to {}: {source}", from.display(), to.display())]
  Install {
    from: PathBuf,
    to: PathBuf,
    source: std::io::Error,
  },

  #[error(transparent)]
  Stage(#[from] StageError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Stdlib(#[from] StdlibError),

  #[error(transparent)]
  Perms(#[from] PermsError),
}

/// A reference interpreter installation providing headers, a core library,
/// and the source tree optional modules are taken from.
///
/// Paths may contain `{arch}` or `{abi}`, substituted per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonInstall {
  pub include_root: PathBuf,
  pub link_root: PathBuf,
  pub source_root: PathBuf,
  /// Prebuilt stdlib archive shipped instead of zipping `Lib/`.
  #[serde(default)]
  pub stdlib_archive: Option<PathBuf>,
}

impl PythonInstall {
  pub fn for_arch(&self, arch: Arch) -> Self {
    let subst = |path: &Path| {
      PathBuf::from(
        path
          .to_string_lossy()
          .replace("{arch}", arch.as_str())
          .replace("{abi}", arch.abi()),
      )
    };
    Self {
      include_root: subst(&self.include_root),
      link_root: subst(&self.link_root),
      source_root: subst(&self.source_root),
      stdlib_archive: self.stdlib_archive.as_deref().map(subst),
    }
  }

  pub fn modules_dir(&self) -> PathBuf {
    self.source_root.join("Modules")
  }

  pub fn stdlib_dir(&self) -> PathBuf {
    self.source_root.join("Lib")
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
  /// Compiler command, possibly with leading arguments (`ccache clang`).
  #[serde(default)]
  pub cc: Option<String>,
}

impl ToolchainConfig {
  /// Config value, then `$CC`, then `clang`.
  pub fn resolve_cc(&self) -> String {
    self
      .cc
      .clone()
      .or_else(|| std::env::var("CC").ok().filter(|cc| !cc.trim().is_empty()))
      .unwrap_or_else(|| DEFAULT_CC.to_string())
  }
}

/// Everything one build needs, passed explicitly to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
  pub python: PythonInstall,
  /// Per-arch build directories live under here.
  pub build_root: PathBuf,
  /// Root of the distributable bundle.
  pub dist_root: PathBuf,
  #[serde(default)]
  pub toolchain: ToolchainConfig,
}

impl BuildConfig {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    Self::from_toml(&text).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: e,
    })
  }

  pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(text)
  }

  pub fn build_dir(&self, arch: Arch) -> PathBuf {
    self.build_root.join(arch.as_str())
  }

  /// Native-library directory of the bundle for `arch`.
  pub fn libs_dir(&self, arch: Arch) -> PathBuf {
    self.dist_root.join("libs").join(arch.abi())
  }

  pub fn bundle_dir(&self) -> PathBuf {
    self.dist_root.join("_python_bundle")
  }

  pub fn site_packages_dir(&self) -> PathBuf {
    self.bundle_dir().join("site-packages")
  }

  pub fn stdlib_archive_path(&self) -> PathBuf {
    self.bundle_dir().join("stdlib.zip")
  }
}

/// Compiler flags derived once per target architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
  pub arch: Arch,
  pub include_paths: Vec<PathBuf>,
  pub link_paths: Vec<PathBuf>,
  pub core_library: PathBuf,
  pub system_libs: Vec<&'static str>,
  pub defines: Vec<&'static str>,
  pub cc: String,
  pub python_src: PathBuf,
}

impl BuildEnvironment {
  pub fn new(
    arch: Arch,
    python: &PythonInstall,
    core_library: PathBuf,
    probe: &ProbeResult,
    build_dir: &Path,
    cc: String,
  ) -> Self {
    let src = &python.source_root;
    Self {
      arch,
      include_paths: vec![
        python.include_root.clone(),
        src.join("Include"),
        src.join("Modules"),
        src.join("Include").join("internal"),
        build_dir.to_path_buf(),
      ],
      link_paths: vec![python.link_root.clone()],
      core_library,
      system_libs: SYSTEM_LIBS.to_vec(),
      defines: probe.feature_flags(),
      cc,
      python_src: src.clone(),
    }
  }

  /// Full compiler argument list producing `output` from `sources`.
  pub fn compile_args(&self, sources: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["-o".to_string(), output.display().to_string()];
    args.extend(sources.iter().map(|s| s.display().to_string()));
    args.extend(self.include_paths.iter().map(|p| format!("-I{}", p.display())));
    args.extend(self.link_paths.iter().map(|p| format!("-L{}", p.display())));
    args.push(self.core_library.display().to_string());
    args.extend(self.system_libs.iter().map(|lib| format!("-l{}", lib)));
    args.extend(self.defines.iter().map(|flag| format!("-D{}", flag)));
    args.push("-static-libstdc++".to_string());
    args
  }
}
