//! Toolchain invocation.
//!
//! The orchestrator only talks to a [`Toolchain`], so tests can stand in for
//! the real compiler.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, error, info};

use super::types::BuildError;

/// One compiler run producing one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInvocation {
  /// Compiler command as configured; may carry leading arguments.
  pub cc: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub output: PathBuf,
}

impl CompileInvocation {
  /// Split the configured command into a program and its leading arguments.
  pub fn program_and_args(&self) -> (String, Vec<String>) {
    let mut words = self.cc.split_whitespace().map(str::to_string);
    let program = words.next().unwrap_or_default();
    let mut args: Vec<String> = words.collect();
    args.extend(self.args.iter().cloned());
    (program, args)
  }
}

pub trait Toolchain {
  /// Run the compiler. Any failure is fatal to the build.
  fn compile(&self, invocation: &CompileInvocation) -> Result<(), BuildError>;
}

/// Runs the compiler as a blocking child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
  fn compile(&self, invocation: &CompileInvocation) -> Result<(), BuildError> {
    let (program, args) = invocation.program_and_args();
    info!(cc = %program, output = %invocation.output.display(), "compiling interpreter");
    debug!(args = ?args, "compiler arguments");

    let output = Command::new(&program)
      .args(&args)
      .current_dir(&invocation.cwd)
      .output()
      .map_err(|e| BuildError::ToolchainSpawn {
        program: program.clone(),
        source: e,
      })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
      if !stderr.is_empty() {
        error!(stderr = %stderr, "compiler stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "compiler stdout");
      }
      return Err(BuildError::ToolchainFailed {
        program,
        code: output.status.code(),
      });
    }

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "compiler diagnostics");
    }

    Ok(())
  }
}
