//! Matrix cells and the order they are built in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::platform::arch::TargetCpu;
use crate::platform::os::Os;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildType {
  Debug,
  Release,
}

impl BuildType {
  pub const ALL: [BuildType; 2] = [BuildType::Debug, BuildType::Release];

  pub fn from_debug(debug: bool) -> Self {
    if debug { BuildType::Debug } else { BuildType::Release }
  }

  pub fn is_debug(&self) -> bool {
    matches!(self, BuildType::Debug)
  }

  /// Directory name in the workspace layout (`Debug` / `Release`).
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildType::Debug => "Debug",
      BuildType::Release => "Release",
    }
  }

  /// Suffix of gn output directories (`debug` / `release`).
  pub fn suffix(&self) -> &'static str {
    match self {
      BuildType::Debug => "debug",
      BuildType::Release => "release",
    }
  }
}

impl fmt::Display for BuildType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One (host OS, CPU, build type) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixCell {
  pub os: Os,
  pub cpu: TargetCpu,
  pub build_type: BuildType,
}

impl MatrixCell {
  pub fn new(os: Os, cpu: TargetCpu, build_type: BuildType) -> Self {
    Self { os, cpu, build_type }
  }
}

impl fmt::Display for MatrixCell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.os, self.cpu, self.build_type)
  }
}

/// Every cell of the full matrix for `os`, in build order:
/// x64 debug, x64 release, x86 debug, x86 release.
pub fn full_matrix(os: Os) -> Vec<MatrixCell> {
  os.matrix_cpus()
    .iter()
    .flat_map(|cpu| BuildType::ALL.iter().map(move |bt| MatrixCell::new(os, *cpu, *bt)))
    .collect()
}

/// The cells a configuration asks for.
pub fn requested_cells(config: &BuildConfig, os: Os) -> Vec<MatrixCell> {
  if config.full_matrix {
    full_matrix(os)
  } else {
    vec![MatrixCell::new(os, config.target_cpu, BuildType::from_debug(config.debug))]
  }
}
