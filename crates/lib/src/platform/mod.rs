pub mod arch;
pub mod paths;
pub mod perms;

use arch::Arch;

/// Host identifier for diagnostics (e.g., "x86_64-linux").
///
/// Returns `None` on hosts whose architecture has no Android ABI.
pub fn host_triple() -> Option<String> {
  Arch::current().map(|arch| format!("{}-{}", arch, std::env::consts::OS))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_triple_format() {
    if let Some(triple) = host_triple() {
      let (arch, os) = triple.split_once('-').unwrap();
      assert!(arch.parse::<Arch>().is_ok());
      assert_eq!(os, std::env::consts::OS);
    }
  }
}
