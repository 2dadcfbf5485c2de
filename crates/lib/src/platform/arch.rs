use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU architectures V8 can be compiled for, named the way gn spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetCpu {
  X64,
  X86,
  Arm64,
}

impl TargetCpu {
  /// The CPU of the machine we are running on, if it is one we can target.
  pub fn host() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X64),
      "x86" => Some(Self::X86),
      "aarch64" => Some(Self::Arm64),
      _ => None,
    }
  }

  /// Returns the gn identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::X86 => "x86",
      Self::Arm64 => "arm64",
    }
  }
}

impl fmt::Display for TargetCpu {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown target cpu '{0}' (expected x64, x86 or arm64)")]
pub struct UnknownCpu(pub String);

impl FromStr for TargetCpu {
  type Err = UnknownCpu;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().trim_matches('"').to_ascii_lowercase().as_str() {
      "x64" | "x86_64" | "amd64" => Ok(Self::X64),
      "x86" | "ia32" | "i686" => Ok(Self::X86),
      "arm64" | "aarch64" => Ok(Self::Arm64),
      other => Err(UnknownCpu(other.to_string())),
    }
  }
}
