use std::fmt;

use serde::{Deserialize, Serialize};

use super::arch::TargetCpu;

/// Host operating systems v8pack can build on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  /// CPUs built in full-matrix mode, in build order.
  ///
  /// macOS toolchains can no longer target 32-bit x86, so it only gets x64.
  pub fn matrix_cpus(&self) -> &'static [TargetCpu] {
    match self {
      Self::MacOs => &[TargetCpu::X64],
      Self::Linux | Self::Windows => &[TargetCpu::X64, TargetCpu::X86],
    }
  }

  pub fn supports_cpu(&self, cpu: TargetCpu) -> bool {
    !(matches!(self, Self::MacOs) && cpu == TargetCpu::X86)
  }

  /// Whether depot_tools is installed from a zip archive instead of a git clone.
  ///
  /// Windows hosts do not ship git or an unzip tool by default.
  pub fn uses_toolchain_archive(&self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Whether the checkout's `install-build-deps.sh` should run after sync.
  pub fn installs_build_deps(&self) -> bool {
    !matches!(self, Self::Windows)
  }

  /// Platform file name of a static library (`v8_monolith` -> `libv8_monolith.a`).
  pub fn static_lib_name(&self, stem: &str) -> String {
    match self {
      Self::Windows => format!("{}.lib", stem),
      Self::Linux | Self::MacOs => format!("lib{}.a", stem),
    }
  }

  /// Name of a depot_tools entry point. On Windows these are batch wrappers.
  pub fn tool_name(&self, tool: &str) -> String {
    match self {
      Self::Windows => format!("{}.bat", tool),
      Self::Linux | Self::MacOs => tool.to_string(),
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
