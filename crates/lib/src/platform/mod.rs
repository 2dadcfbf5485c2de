pub mod arch;
pub mod os;
pub mod paths;

use arch::TargetCpu;
use os::Os;
use std::fmt;

/// Host identifier combining architecture and OS (e.g., "x64-linux")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: TargetCpu,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: TargetCpu, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: TargetCpu::host()?,
      os: Os::current()?,
    })
  }

  /// Returns the platform triple string (e.g., "x64-linux")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

/// Returns the platform triple for the current system (e.g., "x64-darwin")
///
/// Returns `None` if the current platform is not supported
pub fn platform_triple() -> Option<String> {
  Platform::current().map(|p| p.triple())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn platform_triple_format() {
    let platform = Platform::new(TargetCpu::Arm64, Os::MacOs);
    assert_eq!(platform.triple(), "arm64-darwin");

    let platform = Platform::new(TargetCpu::X64, Os::Linux);
    assert_eq!(platform.triple(), "x64-linux");
  }
}
