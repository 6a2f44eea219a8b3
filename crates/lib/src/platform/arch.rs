use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Target CPU architectures an interpreter can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  Aarch64,
  Armv7a,
  X86,
  X86_64,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown architecture: {0} (expected one of arm64-v8a, armeabi-v7a, x86, x86_64)")]
pub struct UnknownArch(pub String);

impl Arch {
  pub const ALL: [Arch; 4] = [Arch::Aarch64, Arch::Armv7a, Arch::X86, Arch::X86_64];

  /// Detect the host CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      "x86" => Some(Self::X86),
      "arm" => Some(Self::Armv7a),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Aarch64 => "aarch64",
      Self::Armv7a => "armv7a",
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
    }
  }

  /// Returns the packaging ABI directory name (e.g. `arm64-v8a`)
  pub fn abi(&self) -> &'static str {
    match self {
      Self::Aarch64 => "arm64-v8a",
      Self::Armv7a => "armeabi-v7a",
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
    }
  }
}

impl FromStr for Arch {
  type Err = UnknownArch;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Arch::ALL
      .into_iter()
      .find(|arch| arch.as_str() == s || arch.abi() == s)
      .or(match s {
        "arm64" => Some(Arch::Aarch64),
        "arm" | "armv7" => Some(Arch::Armv7a),
        _ => None,
      })
      .ok_or_else(|| UnknownArch(s.to_string()))
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_abi_and_arch_names() {
    assert_eq!("arm64-v8a".parse::<Arch>(), Ok(Arch::Aarch64));
    assert_eq!("aarch64".parse::<Arch>(), Ok(Arch::Aarch64));
    assert_eq!("armeabi-v7a".parse::<Arch>(), Ok(Arch::Armv7a));
    assert_eq!("x86_64".parse::<Arch>(), Ok(Arch::X86_64));
    assert_eq!("x86".parse::<Arch>(), Ok(Arch::X86));
  }

  #[test]
  fn rejects_unknown_arch() {
    let err = "mips".parse::<Arch>().unwrap_err();
    assert_eq!(err, UnknownArch("mips".to_string()));
  }

  #[test]
  fn abi_names_match_packaging_layout() {
    assert_eq!(Arch::Aarch64.abi(), "arm64-v8a");
    assert_eq!(Arch::Armv7a.abi(), "armeabi-v7a");
  }
}
