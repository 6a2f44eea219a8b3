//! Build orchestration.
//!
//! [`run_build`] takes an explicit [`BuildConfig`] and target [`Arch`] and runs
//! every step in order:
//!
//! 1. Locate the interpreter core library (fatal if absent)
//! 2. Write the entry point and stage available optional module sources
//! 3. Generate the embedding manifest
//! 4. Invoke the toolchain once
//! 5. Package the stdlib allow-list and archive
//! 6. Install the binary under its packaging name

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::consts::{BINARY_NAME, INSTALLED_BINARY_NAME, MAIN_SOURCE_NAME, MANIFEST_SOURCE_NAME, STAGED_MODULES_DIR};
use crate::manifest::EmbeddingManifest;
use crate::platform::arch::Arch;
use crate::platform::perms::make_executable;
use crate::probe::{ProbeResult, probe_modules, stage_module_sources};

use super::stdlib::{ArchiveStatus, PackageReport, ensure_stdlib_archive, package_stdlib};
use super::templates::MAIN_SOURCE;
use super::toolchain::{CompileInvocation, Toolchain};
use super::types::{BuildConfig, BuildEnvironment, BuildError, CORE_LIBRARY_CANDIDATES};

/// Artifacts and reports of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutput {
  pub arch: String,
  pub build_dir: PathBuf,
  pub manifest_path: PathBuf,
  pub core_library: PathBuf,
  /// Toolchain output inside the build directory.
  pub binary: PathBuf,
  /// Distributable copy in the bundle's libs directory.
  pub installed: PathBuf,
  pub probe: ProbeResult,
  pub stdlib: PackageReport,
  pub archive: ArchiveStatus,
}

/// Run the full pipeline for one architecture.
pub fn run_build(config: &BuildConfig, arch: Arch, toolchain: &dyn Toolchain) -> Result<BuildOutput, BuildError> {
  let python = config.python.for_arch(arch);
  let build_dir = config.build_dir(arch);
  info!(arch = %arch, build_dir = %build_dir.display(), "starting interpreter build");

  debug!(step = "locate-core", "build step");
  let core_library = locate_core_library(&python.link_root)?;

  debug!(step = "stage-sources", "build step");
  create_dir(&build_dir)?;
  let main_source = build_dir.join(MAIN_SOURCE_NAME);
  if !main_source.exists() {
    fs::write(&main_source, MAIN_SOURCE).map_err(|e| BuildError::WriteFile {
      path: main_source.clone(),
      source: e,
    })?;
    debug!(path = %main_source.display(), "wrote interpreter entry point");
  }
  let probe = probe_modules(&python.modules_dir());
  let staged = stage_module_sources(&probe, &build_dir.join(STAGED_MODULES_DIR))?;
  info!(
    available = probe.available().count(),
    files = staged.len(),
    "staged optional module sources"
  );

  debug!(step = "generate-manifest", "build step");
  let manifest_path = build_dir.join(MANIFEST_SOURCE_NAME);
  EmbeddingManifest::from_probe(&probe).write_to(&manifest_path)?;

  debug!(step = "compile", "build step");
  let env = BuildEnvironment::new(
    arch,
    &python,
    core_library.clone(),
    &probe,
    &build_dir,
    config.toolchain.resolve_cc(),
  );
  let binary = build_dir.join(BINARY_NAME);
  remove_stale(&binary)?;
  let invocation = CompileInvocation {
    cc: env.cc.clone(),
    args: env.compile_args(&[main_source, manifest_path.clone()], &binary),
    cwd: build_dir.clone(),
    output: binary.clone(),
  };
  toolchain.compile(&invocation)?;
  if !binary.is_file() {
    return Err(BuildError::MissingOutput { path: binary });
  }

  // Nothing is installed unless packaging succeeded.
  debug!(step = "package-stdlib", "build step");
  let stdlib = package_stdlib(&python.stdlib_dir(), &config.site_packages_dir())?;
  let archive = ensure_stdlib_archive(
    &config.stdlib_archive_path(),
    python.stdlib_archive.as_deref(),
    &python.stdlib_dir(),
  )?;

  debug!(step = "install", "build step");
  let installed = install_binary(&binary, &config.libs_dir(arch))?;

  info!(arch = %arch, installed = %installed.display(), "interpreter build complete");

  Ok(BuildOutput {
    arch: arch.to_string(),
    build_dir,
    manifest_path,
    core_library,
    binary,
    installed,
    probe,
    stdlib,
    archive,
  })
}

/// Find the first existing core library candidate under `link_root`.
pub fn locate_core_library(link_root: &Path) -> Result<PathBuf, BuildError> {
  CORE_LIBRARY_CANDIDATES
    .iter()
    .map(|name| link_root.join(name))
    .find(|path| path.is_file())
    .inspect(|path| debug!(path = %path.display(), "found core library"))
    .ok_or_else(|| BuildError::CoreLibraryNotFound {
      link_root: link_root.to_path_buf(),
      tried: CORE_LIBRARY_CANDIDATES.iter().map(|s| s.to_string()).collect(),
    })
}

/// Copy `binary` into `libs_dir` under its packaging name and mark it executable.
///
/// The copy goes through a temporary sibling, so the destination either holds
/// the previous binary or the complete new one.
pub fn install_binary(binary: &Path, libs_dir: &Path) -> Result<PathBuf, BuildError> {
  create_dir(libs_dir)?;
  let dest = libs_dir.join(INSTALLED_BINARY_NAME);
  let install_err = |source| BuildError::Install {
    from: binary.to_path_buf(),
    to: dest.clone(),
    source,
  };

  let tmp = tempfile::NamedTempFile::new_in(libs_dir).map_err(install_err)?;
  fs::copy(binary, tmp.path()).map_err(install_err)?;
  make_executable(tmp.path())?;
  tmp.persist(&dest).map_err(|e| install_err(e.error))?;

  info!(path = %dest.display(), "installed interpreter");
  Ok(dest)
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
  fs::create_dir_all(path).map_err(|e| BuildError::CreateDir {
    path: path.to_path_buf(),
    source: e,
  })
}

fn remove_stale(path: &Path) -> Result<(), BuildError> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(BuildError::WriteFile {
      path: path.to_path_buf(),
      source: e,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::stdlib::StdlibError;
  use crate::build::types::{PythonInstall, ToolchainConfig};
  use std::cell::RefCell;
  use tempfile::TempDir;

  /// Records invocations and writes a fake executable.
  #[derive(Default)]
  struct FakeToolchain {
    fail: bool,
    calls: RefCell<Vec<CompileInvocation>>,
  }

  impl Toolchain for FakeToolchain {
    fn compile(&self, invocation: &CompileInvocation) -> Result<(), BuildError> {
      self.calls.borrow_mut().push(invocation.clone());
      if self.fail {
        return Err(BuildError::ToolchainFailed {
          program: invocation.cc.clone(),
          code: Some(1),
        });
      }
      fs::write(&invocation.output, b"\x7fELF fake").unwrap();
      Ok(())
    }
  }

  fn write(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, rel).unwrap();
  }

  fn fixture(temp: &TempDir, with_core: bool) -> BuildConfig {
    let root = temp.path();
    if with_core {
      write(root, "python/lib/libpython3.11.so");
    }
    fs::create_dir_all(root.join("python/lib")).unwrap();
    write(root, "python/src/Modules/_struct.c");
    write(root, "python/src/Modules/selectmodule.c");
    write(root, "python/src/Lib/encodings/__init__.py");
    write(root, "python/src/Lib/encodings/__pycache__/__init__.cpython-311.pyc");
    write(root, "python/src/Lib/os.py");

    BuildConfig {
      python: PythonInstall {
        include_root: root.join("python/include"),
        link_root: root.join("python/lib"),
        source_root: root.join("python/src"),
        stdlib_archive: None,
      },
      build_root: root.join("build"),
      dist_root: root.join("dist"),
      toolchain: ToolchainConfig {
        cc: Some("clang".to_string()),
      },
    }
  }

  #[test]
  fn locate_prefers_static_library() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "libpython3.11.so");
    write(temp.path(), "libpython3.11.a");

    let found = locate_core_library(temp.path()).unwrap();
    assert_eq!(found, temp.path().join("libpython3.11.a"));
  }

  #[test]
  fn locate_falls_back_to_abi3_library() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "libpython3.so");

    let found = locate_core_library(temp.path()).unwrap();
    assert_eq!(found, temp.path().join("libpython3.so"));
  }

  #[test]
  fn full_build_installs_binary_and_stdlib() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, true);
    let toolchain = FakeToolchain::default();

    let output = run_build(&config, Arch::Aarch64, &toolchain).unwrap();

    assert_eq!(output.installed, temp.path().join("dist/libs/arm64-v8a/libmini_python.so"));
    assert_eq!(fs::read(&output.installed).unwrap(), b"\x7fELF fake");
    #[cfg(unix)]
    assert!(crate::platform::perms::is_executable(&output.installed));

    let build_dir = temp.path().join("build/aarch64");
    assert_eq!(fs::read_to_string(build_dir.join("mini_python.c")).unwrap(), MAIN_SOURCE);
    assert!(build_dir.join("modules/_struct.c").is_file());
    assert!(build_dir.join("modules/selectmodule.c").is_file());

    let manifest = fs::read_to_string(&output.manifest_path).unwrap();
    assert!(manifest.contains("PyInit__struct"));
    assert!(!manifest.contains("PyInit__posixsubprocess"));

    let calls = toolchain.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].args.contains(&"-DHAVE_STRUCT_MODULE".to_string()));
    assert!(calls[0].args.contains(&"-DHAVE_SELECT".to_string()));
    assert!(calls[0].args.contains(&output.manifest_path.display().to_string()));

    assert_eq!(output.stdlib.copied, vec!["encodings", "os.py"]);
    assert!(temp.path().join("dist/_python_bundle/site-packages/os.py").is_file());
    assert!(matches!(output.archive, ArchiveStatus::Built { .. }));
    assert!(temp.path().join("dist/_python_bundle/stdlib.zip").is_file());
  }

  #[test]
  fn missing_core_library_aborts_before_install() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, false);
    let toolchain = FakeToolchain::default();

    let err = run_build(&config, Arch::Aarch64, &toolchain).unwrap_err();

    assert!(matches!(err, BuildError::CoreLibraryNotFound { ref tried, .. } if tried.len() == 3));
    assert!(toolchain.calls.borrow().is_empty());
    assert!(!temp.path().join("dist/libs/arm64-v8a/libmini_python.so").exists());
  }

  #[test]
  fn toolchain_failure_publishes_nothing() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, true);
    let toolchain = FakeToolchain {
      fail: true,
      ..Default::default()
    };

    let err = run_build(&config, Arch::X86_64, &toolchain).unwrap_err();

    assert!(matches!(err, BuildError::ToolchainFailed { .. }));
    assert!(!temp.path().join("dist/libs/x86_64/libmini_python.so").exists());
    assert!(!temp.path().join("dist/_python_bundle").exists());
  }

  #[test]
  fn stdlib_failure_installs_no_binary() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, true);
    fs::remove_dir_all(temp.path().join("python/src/Lib/encodings/__pycache__")).unwrap();

    let err = run_build(&config, Arch::Aarch64, &FakeToolchain::default()).unwrap_err();

    assert!(matches!(err, BuildError::Stdlib(StdlibError::MissingSentinel { .. })));
    assert!(!temp.path().join("dist/libs/arm64-v8a").exists());
  }

  #[test]
  fn stale_build_output_is_not_reinstalled() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, true);
    write(temp.path(), "build/aarch64/mini_python");
    let toolchain = FakeToolchain {
      fail: true,
      ..Default::default()
    };

    run_build(&config, Arch::Aarch64, &toolchain).unwrap_err();

    assert!(!temp.path().join("build/aarch64/mini_python").exists());
  }

  #[test]
  fn existing_entry_point_is_kept() {
    let temp = TempDir::new().unwrap();
    let config = fixture(&temp, true);
    write(temp.path(), "build/aarch64/mini_python.c");

    run_build(&config, Arch::Aarch64, &FakeToolchain::default()).unwrap();

    assert_eq!(
      fs::read_to_string(temp.path().join("build/aarch64/mini_python.c")).unwrap(),
      "build/aarch64/mini_python.c"
    );
  }

  #[test]
  fn install_replaces_previous_binary() {
    let temp = TempDir::new().unwrap();
    let binary = temp.path().join("mini_python");
    let libs = temp.path().join("libs");
    fs::create_dir_all(&libs).unwrap();
    fs::write(libs.join(INSTALLED_BINARY_NAME), b"old").unwrap();
    fs::write(&binary, b"new").unwrap();

    let dest = install_binary(&binary, &libs).unwrap();

    assert_eq!(fs::read(dest).unwrap(), b"new");
    assert_eq!(fs::read_dir(&libs).unwrap().count(), 1);
  }
}
