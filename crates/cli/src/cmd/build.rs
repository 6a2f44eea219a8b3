//! Implementation of the `minipy build` command.
//!
//! Compiles the interpreter for one architecture and packages the stdlib into
//! the distributable bundle described by the config file.

use std::path::Path;

use anyhow::{Context, Result};

use minipy_lib::build::stdlib::ArchiveStatus;
use minipy_lib::build::{BuildConfig, SystemToolchain, run_build};
use minipy_lib::platform::arch::Arch;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

/// Execute the build command.
///
/// Any pipeline error (missing core library, toolchain failure, ...) is
/// returned and becomes a non-zero exit status.
pub fn cmd_build(arch: Arch, config: &Path, output: OutputFormat) -> Result<()> {
  let config = BuildConfig::from_file(config).context("Failed to load build config")?;

  let result = run_build(&config, arch, &SystemToolchain).with_context(|| format!("Build for {} failed", arch))?;

  if output.is_json() {
    print_json(&result)?;
    return Ok(());
  }

  println!();
  print_success(&format!("Built interpreter for {} ({})", arch, arch.abi()));
  print_stat("Installed", &result.installed.display().to_string());
  print_stat("Core library", &result.core_library.display().to_string());
  print_stat("Manifest", &result.manifest_path.display().to_string());

  let available: Vec<_> = result.probe.available().map(|m| m.name).collect();
  if available.is_empty() {
    print_stat("Optional modules", "none");
  } else {
    print_stat("Optional modules", &available.join(", "));
  }
  print_stat(
    "Stdlib",
    &format!("{} copied, {} skipped", result.stdlib.copied.len(), result.stdlib.skipped.len()),
  );
  print_info(&describe_archive(&result.archive));

  Ok(())
}

fn describe_archive(status: &ArchiveStatus) -> String {
  match status {
    ArchiveStatus::AlreadyPresent => "Stdlib archive already present".to_string(),
    ArchiveStatus::CopiedPrebuilt { from } => format!("Stdlib archive copied from {}", from.display()),
    ArchiveStatus::Built { entries } => format!("Stdlib archive built ({} entries)", entries),
    ArchiveStatus::Unavailable => "No stdlib archive available".to_string(),
  }
}
