//! Implementation of the `minipy run` command.
//!
//! Drives the runtime bootstrapper the way an application host would: the
//! bootstrap is scheduled as a deferred task and its result printed.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use minipy_lib::platform::paths::RuntimeLayout;
use minipy_lib::runtime::schedule_bootstrap;

/// Execute the run command.
///
/// Bootstrap failures are part of the printed output (`[Error] ...`), so this
/// only fails when the script itself cannot be read or the layout is unknown.
pub fn cmd_run(script: &str, files_dir: Option<PathBuf>, native_lib_dir: Option<PathBuf>) -> Result<()> {
  let source = read_script(script)?;
  let layout = RuntimeLayout::resolve(files_dir, native_lib_dir).context("Failed to resolve runtime layout")?;
  debug!(
    files_dir = %layout.files_dir().display(),
    native_lib_dir = %layout.native_lib_dir().display(),
    "resolved runtime layout"
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let task = schedule_bootstrap(rt.handle(), layout, source);
  let text = rt.block_on(task).context("Bootstrap task failed")?;

  println!("{}", text);
  Ok(())
}

fn read_script(script: &str) -> Result<String> {
  if script == "-" {
    let mut source = String::new();
    std::io::stdin()
      .read_to_string(&mut source)
      .context("Failed to read script from stdin")?;
    Ok(source)
  } else {
    std::fs::read_to_string(script).with_context(|| format!("Failed to read script {}", script))
  }
}
