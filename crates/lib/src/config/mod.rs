//! Build configuration.
//!
//! A [`ConfigFile`] is the loose, partially specified form read from TOML, the
//! command line or the interactive prompts. [`ConfigFile::resolve`] validates
//! it into an immutable [`BuildConfig`] before any stage touches the disk.

pub mod gn;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{BASE_LIBRARY_STEM, CONFIG_FILENAME, MONOLITH_TARGET};
use crate::platform::arch::TargetCpu;
use crate::platform::os::Os;
use crate::platform::paths::user_config_file;

pub use gn::{GnArgs, GnArgsError, GnValue};

/// Arguments controlled per matrix cell; a config may not set them directly.
pub const RESERVED_ARGS: &[&str] = &["is_debug", "symbol_level", "target_cpu", "v8_target_cpu"];

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },

  #[error("failed to resolve workspace root '{path}': {source}")]
  Root {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("target cpu {cpu} cannot be built on {os}")]
  UnsupportedCpu { cpu: TargetCpu, os: Os },

  #[error("the msvc toolchain is only available on windows hosts")]
  MsvcOffWindows,

  #[error("unknown toolchain '{0}' (expected clang or msvc)")]
  UnknownToolchain(String),

  #[error("gn argument '{0}' is set per matrix cell and cannot be configured")]
  ReservedArg(String),

  #[error(transparent)]
  GnArg(#[from] GnArgsError),
}

/// Compiler family used for the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
  /// Chromium's bundled clang.
  #[default]
  Clang,
  /// The locally installed Visual Studio compiler.
  Msvc,
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Toolchain::Clang => write!(f, "clang"),
      Toolchain::Msvc => write!(f, "msvc"),
    }
  }
}

impl FromStr for Toolchain {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "clang" => Ok(Toolchain::Clang),
      "msvc" | "cl" => Ok(Toolchain::Msvc),
      other => Err(ConfigError::UnknownToolchain(other.to_string())),
    }
  }
}

/// Partially specified configuration, as written in `v8pack.toml`.
///
/// ```toml
/// full_matrix = true
/// toolchain = "clang"
///
/// [gn_args]
/// v8_enable_i18n_support = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
  pub root: Option<PathBuf>,
  pub full_matrix: Option<bool>,
  pub debug: Option<bool>,
  pub target_cpu: Option<TargetCpu>,
  pub toolchain: Option<Toolchain>,
  pub monolithic: Option<bool>,
  pub revision: Option<String>,
  #[serde(default)]
  pub gn_args: BTreeMap<String, GnValue>,
}

impl ConfigFile {
  pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      source: Box::new(e),
    })
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Self::parse(&content, path)
  }

  /// Layer `overrides` on top of `self`. Set fields in `overrides` win;
  /// gn argument tables are merged key by key.
  pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
    let mut gn_args = self.gn_args;
    gn_args.extend(overrides.gn_args);

    ConfigFile {
      root: overrides.root.or(self.root),
      full_matrix: overrides.full_matrix.or(self.full_matrix),
      debug: overrides.debug.or(self.debug),
      target_cpu: overrides.target_cpu.or(self.target_cpu),
      toolchain: overrides.toolchain.or(self.toolchain),
      monolithic: overrides.monolithic.or(self.monolithic),
      revision: overrides.revision.or(self.revision),
      gn_args,
    }
  }

  /// Validate and fill defaults for a build on `host`.
  pub fn resolve(self, host: Os) -> Result<BuildConfig, ConfigError> {
    let root = match self.root {
      Some(root) => root,
      None => std::env::current_dir().map_err(|e| ConfigError::Root {
        path: PathBuf::from("."),
        source: e,
      })?,
    };
    let root = std::path::absolute(&root).map_err(|e| ConfigError::Root { path: root, source: e })?;

    let target_cpu = match self.target_cpu {
      Some(cpu) => cpu,
      None => TargetCpu::host()
        .filter(|cpu| host.supports_cpu(*cpu))
        .unwrap_or(TargetCpu::X64),
    };
    let full_matrix = self.full_matrix.unwrap_or(false);
    if !full_matrix && !host.supports_cpu(target_cpu) {
      return Err(ConfigError::UnsupportedCpu { cpu: target_cpu, os: host });
    }

    let toolchain = self.toolchain.unwrap_or_default();
    if toolchain == Toolchain::Msvc && host != Os::Windows {
      return Err(ConfigError::MsvcOffWindows);
    }

    let mut extra_args = GnArgs::new();
    for (key, value) in self.gn_args {
      if RESERVED_ARGS.contains(&key.as_str()) {
        return Err(ConfigError::ReservedArg(key));
      }
      extra_args.set(&key, value)?;
    }

    Ok(BuildConfig {
      root,
      full_matrix,
      debug: self.debug.unwrap_or(false),
      target_cpu,
      toolchain,
      monolithic: self.monolithic.unwrap_or(true),
      revision: self.revision.filter(|rev| !rev.trim().is_empty()),
      extra_args,
    })
  }
}

/// Validated configuration for one run. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  pub root: PathBuf,
  pub full_matrix: bool,
  /// Build type for single-cell runs. Ignored in full-matrix mode.
  pub debug: bool,
  /// CPU for single-cell runs. Ignored in full-matrix mode.
  pub target_cpu: TargetCpu,
  pub toolchain: Toolchain,
  pub monolithic: bool,
  /// Git revision to check out before syncing a fresh checkout.
  pub revision: Option<String>,
  pub extra_args: GnArgs,
}

impl BuildConfig {
  /// gn arguments shared by every cell. Cell-specific keys are added later.
  pub fn gn_template(&self) -> GnArgs {
    let mut args = GnArgs::new();
    args.insert_known("is_component_build", GnValue::Bool(false));
    args.insert_known("v8_use_external_startup_data", GnValue::Bool(false));
    args.insert_known("use_custom_libcxx", GnValue::Bool(false));
    args.insert_known("treat_warnings_as_errors", GnValue::Bool(false));
    args.insert_known("is_clang", GnValue::Bool(self.toolchain == Toolchain::Clang));
    if self.monolithic {
      args.insert_known("v8_monolithic", GnValue::Bool(true));
    } else {
      args.insert_known("v8_static_library", GnValue::Bool(true));
    }

    args.overlay(&self.extra_args);
    args
  }

  /// File stem of the library a cell produces.
  pub fn artifact_stem(&self) -> &'static str {
    if self.monolithic { MONOLITH_TARGET } else { BASE_LIBRARY_STEM }
  }

  /// ninja target to build, `None` for the default target.
  pub fn ninja_target(&self) -> Option<&'static str> {
    self.monolithic.then_some(MONOLITH_TARGET)
  }
}

/// Find the config file to use.
///
/// An explicit path always wins. Otherwise `v8pack.toml` in `cwd`, then the
/// user config directory.
pub fn discover_config(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  let local = cwd.join(CONFIG_FILENAME);
  if local.is_file() {
    return Some(local);
  }

  user_config_file().filter(|path| path.is_file())
}
