use std::path::Path;

use minipy_lib::consts::RUNTIME_VERSION;
use minipy_lib::platform::arch::Arch;
use minipy_lib::platform::host_triple;
use minipy_lib::probe::{OPTIONAL_MODULES, probe_modules};

use crate::output::{print_stat, symbols};

pub fn cmd_info(modules_dir: Option<&Path>) {
  println!("System:");
  match host_triple() {
    Some(triple) => print_stat("Platform", &triple),
    _ => println!("Could not detect platform."),
  }
  print_stat("Runtime", RUNTIME_VERSION);

  println!();
  println!("Targets:");
  for arch in Arch::ALL {
    print_stat(arch.as_str(), arch.abi());
  }

  println!();
  println!("Optional modules:");
  match modules_dir {
    Some(dir) => {
      let probe = probe_modules(dir);
      for module in &probe.modules {
        let mark = if module.is_available() { symbols::SUCCESS } else { symbols::ERROR };
        println!("  {} {} ({})", mark, module.name, module.feature_flag);
      }
    }
    None => {
      for module in OPTIONAL_MODULES {
        println!("  {} {} ({})", symbols::INFO, module.name, module.feature_flag);
      }
    }
  }
}
