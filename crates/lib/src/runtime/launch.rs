//! Child process launch with merged output streams.

use std::io::PipeReader;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::BootstrapError;
use super::env::ProcessEnvironment;

/// A running interpreter and the read end of its combined stdout/stderr.
#[derive(Debug)]
pub struct LaunchedProcess {
  pub child: Child,
  pub output: PipeReader,
}

/// Start `interpreter` with `script` as its only argument.
///
/// Stdout and stderr share one pipe, so the caller sees them interleaved in
/// write order. The inherited environment is kept and `env` is applied on top.
pub fn launch(interpreter: &Path, script: &Path, env: &ProcessEnvironment) -> Result<LaunchedProcess, BootstrapError> {
  let (reader, writer) = std::io::pipe().map_err(BootstrapError::Pipe)?;
  let writer_err = writer.try_clone().map_err(BootstrapError::Pipe)?;

  // The command owns the write ends; it must be dropped after spawning or the
  // reader never sees end-of-input.
  let child = {
    let mut command = Command::new(interpreter);
    command
      .arg(script)
      .stdin(Stdio::null())
      .stdout(writer)
      .stderr(writer_err);
    for (key, value) in env.iter() {
      command.env(key, value);
    }

    debug!(interpreter = %interpreter.display(), script = %script.display(), "spawning interpreter");
    command.spawn().map_err(|e| BootstrapError::Launch {
      program: interpreter.to_path_buf(),
      source: e,
    })?
  };

  Ok(LaunchedProcess { child, output: reader })
}
