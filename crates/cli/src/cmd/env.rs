//! Implementation of the `minipy env` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use minipy_lib::platform::paths::RuntimeLayout;
use minipy_lib::runtime::ProcessEnvironment;

use crate::output::{OutputFormat, print_json};

pub fn cmd_env(files_dir: Option<PathBuf>, native_lib_dir: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let layout = RuntimeLayout::resolve(files_dir, native_lib_dir).context("Failed to resolve runtime layout")?;
  let env = ProcessEnvironment::for_layout(&layout);

  if output.is_json() {
    let vars: BTreeMap<_, _> = env.iter().collect();
    print_json(&vars)?;
  } else {
    for (key, value) in env.iter() {
      println!("{}={}", key, value);
    }
  }

  Ok(())
}
