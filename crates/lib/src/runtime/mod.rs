//! Runtime bootstrapper for the embedded interpreter.
//!
//! On each launch the bootstrapper makes sure the stdlib is extracted and the
//! interpreter binary is staged (both one-time, idempotent steps), writes the
//! script to run, then launches the interpreter and drains its output.
//!
//! The filesystem is the only shared state and exactly one bootstrap runs per
//! application lifetime, so no locking is done.
//!
//! # Submodules
//!
//! - [`extract`] - Sentinel-guarded stdlib extraction
//! - [`stage`] - Idempotent copy of the interpreter binary
//! - [`env`] - Child process environment
//! - [`launch`] - Process spawn with merged output
//! - [`collect`] - Output draining
//! - [`schedule`] - Deferred single-shot bootstrap task

pub mod collect;
pub mod env;
pub mod extract;
pub mod launch;
pub mod schedule;
pub mod stage;

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::platform::paths::{LayoutError, RuntimeLayout};
use crate::platform::perms::PermsError;

pub use collect::{ExecutionResult, collect, read_lines};
pub use env::ProcessEnvironment;
pub use extract::{ExtractOutcome, extract_stdlib_if_needed};
pub use launch::{LaunchedProcess, launch};
pub use schedule::schedule_bootstrap;
pub use stage::{StageOutcome, stage_interpreter};

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error(transparent)]
  Layout(#[from] LayoutError),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write script {}: {source}", path.display())]
  WriteScript { path: PathBuf, source: std::io::Error },

  #[error("bundled interpreter not found at {}", path.display())]
  MissingInterpreter { path: PathBuf },

  #[error("failed to stage interpreter {} to {}: {source}", from.display(), to.display())]
  StageCopy {
    from: PathBuf,
    to: PathBuf,
    source: std::io::Error,
  },

  #[error(transparent)]
  Perms(#[from] PermsError),

  #[error("failed to create output pipe: {0}")]
  Pipe(#[source] std::io::Error),

  #[error("failed to launch {}: {source}", program.display())]
  Launch { program: PathBuf, source: std::io::Error },

  #[error("failed to read interpreter output: {0}")]
  Read(#[source] std::io::Error),

  #[error("failed to wait for interpreter: {0}")]
  Wait(#[source] std::io::Error),
}

/// Filesystem state ready for launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLaunch {
  pub interpreter: PathBuf,
  pub script: PathBuf,
  pub env: ProcessEnvironment,
  pub extract: ExtractOutcome,
  pub stage: StageOutcome,
}

#[derive(Debug, Clone)]
pub struct Bootstrapper {
  layout: RuntimeLayout,
}

impl Bootstrapper {
  pub fn new(layout: RuntimeLayout) -> Self {
    Self { layout }
  }

  pub fn layout(&self) -> &RuntimeLayout {
    &self.layout
  }

  /// Prepare everything short of spawning the child.
  ///
  /// A failed extraction is logged and carried in the result; the launch
  /// still goes ahead and any import failure shows up in the script output.
  pub fn prepare(&self, script_source: &str) -> Result<PreparedLaunch, BootstrapError> {
    let layout = self.resolved_layout()?;

    let extract = extract_stdlib_if_needed(&layout.stdlib_archive(), &layout.stdlib_dir());

    let script = layout.script_path();
    fs::write(&script, script_source).map_err(|e| BootstrapError::WriteScript {
      path: script.clone(),
      source: e,
    })?;

    let interpreter = layout.staged_interpreter();
    let stage = stage_interpreter(&layout.bundled_interpreter(), &interpreter)?;

    Ok(PreparedLaunch {
      interpreter,
      script,
      env: ProcessEnvironment::for_layout(&layout),
      extract,
      stage,
    })
  }

  /// Prepare, launch and drain. Blocks until the interpreter exits.
  pub fn run(&self, script_source: &str) -> Result<ExecutionResult, BootstrapError> {
    let prepared = self.prepare(script_source)?;
    let process = launch(&prepared.interpreter, &prepared.script, &prepared.env)?;
    let result = collect(process)?;
    info!(lines = result.lines.len(), exit_code = ?result.exit_code, "interpreter finished");
    Ok(result)
  }

  /// Absolute layout with the writable root created.
  fn resolved_layout(&self) -> Result<RuntimeLayout, BootstrapError> {
    let files_dir = self.layout.files_dir();
    fs::create_dir_all(files_dir).map_err(|e| BootstrapError::CreateDir {
      path: files_dir.to_path_buf(),
      source: e,
    })?;
    let files_dir = dunce::canonicalize(files_dir).map_err(|e| BootstrapError::CreateDir {
      path: files_dir.to_path_buf(),
      source: e,
    })?;
    let native_lib_dir =
      std::path::absolute(self.layout.native_lib_dir()).unwrap_or_else(|_| self.layout.native_lib_dir().to_path_buf());
    Ok(RuntimeLayout::new(files_dir, native_lib_dir))
  }
}

/// Run `script_source` and return the text to show the user.
///
/// Never fails: a bootstrap error becomes an `[Error] ...` string so the host
/// keeps running.
pub fn run_script(layout: &RuntimeLayout, script_source: &str) -> String {
  match Bootstrapper::new(layout.clone()).run(script_source) {
    Ok(result) => result.text(),
    Err(e) => {
      error!(error = %e, "bootstrap failed");
      error_text(&e)
    }
  }
}

pub fn error_text(err: &dyn std::fmt::Display) -> String {
  format!("[Error] {}", err)
}
