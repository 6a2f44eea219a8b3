mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minipy_lib::platform::arch::Arch;

use crate::output::OutputFormat;

/// minipy - build and launch a minimal embedded Python interpreter
#[derive(Parser)]
#[command(name = "minipy")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build and package the interpreter for one target architecture
  Build {
    /// Target architecture (e.g. arm64-v8a, armeabi-v7a, x86, x86_64)
    #[arg(short, long)]
    arch: Arch,

    /// Build configuration file
    #[arg(short, long, default_value = "minipy.toml")]
    config: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Run a script with the bundled interpreter
  Run {
    /// Script file to run, or `-` for stdin
    #[arg(default_value = "-")]
    script: String,

    /// Writable root (defaults to $MINIPY_FILES_DIR)
    #[arg(long)]
    files_dir: Option<PathBuf>,

    /// Directory holding libmini_python.so (defaults to $MINIPY_NATIVE_LIB_DIR)
    #[arg(long)]
    native_lib_dir: Option<PathBuf>,
  },

  /// Show the environment the interpreter is launched with
  Env {
    /// Writable root (defaults to $MINIPY_FILES_DIR)
    #[arg(long)]
    files_dir: Option<PathBuf>,

    /// Directory holding libmini_python.so (defaults to $MINIPY_NATIVE_LIB_DIR)
    #[arg(long)]
    native_lib_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Display host and target information
  Info {
    /// Probe an interpreter `Modules/` directory for optional modules
    #[arg(long)]
    modules_dir: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build { arch, config, output } => cmd::cmd_build(arch, &config, output),
    Commands::Run {
      script,
      files_dir,
      native_lib_dir,
    } => cmd::cmd_run(&script, files_dir, native_lib_dir),
    Commands::Env {
      files_dir,
      native_lib_dir,
      output,
    } => cmd::cmd_env(files_dir, native_lib_dir, output),
    Commands::Info { modules_dir } => {
      cmd::cmd_info(modules_dir.as_deref());
      Ok(())
    }
  }
}
