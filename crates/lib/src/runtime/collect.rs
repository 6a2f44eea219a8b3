//! Drains interpreter output.

use std::io::{BufRead, BufReader};
use std::process::ExitStatus;

use crate::consts::NO_OUTPUT;

use super::BootstrapError;
use super::launch::LaunchedProcess;

/// Captured output of one interpreter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
  pub lines: Vec<String>,
  /// `None` when the child was killed by a signal.
  pub exit_code: Option<i32>,
}

impl ExecutionResult {
  /// Output joined with newlines, or the placeholder when nothing was printed.
  pub fn text(&self) -> String {
    if self.lines.is_empty() {
      NO_OUTPUT.to_string()
    } else {
      self.lines.join("\n")
    }
  }

  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }
}

/// Read lines until end-of-input, in arrival order.
///
/// Invalid UTF-8 is replaced rather than aborting the drain.
pub fn read_lines(reader: impl BufRead) -> std::io::Result<Vec<String>> {
  reader
    .split(b'\n')
    .map(|line| {
      line.map(|mut bytes| {
        if bytes.last() == Some(&b'\r') {
          bytes.pop();
        }
        String::from_utf8_lossy(&bytes).into_owned()
      })
    })
    .collect()
}

/// Block until the child closes its output and exits.
pub fn collect(process: LaunchedProcess) -> Result<ExecutionResult, BootstrapError> {
  let LaunchedProcess { mut child, output } = process;
  let lines = read_lines(BufReader::new(output));
  finish(lines, || child.wait())
}

/// The child is reaped even when reading its output failed.
fn finish(
  lines: std::io::Result<Vec<String>>,
  wait: impl FnOnce() -> std::io::Result<ExitStatus>,
) -> Result<ExecutionResult, BootstrapError> {
  let status = wait().map_err(BootstrapError::Wait)?;
  let lines = lines.map_err(BootstrapError::Read)?;

  Ok(ExecutionResult {
    lines,
    exit_code: status.code(),
  })
}
