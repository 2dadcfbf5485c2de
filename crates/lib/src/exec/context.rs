//! Immutable environment for child processes.
//!
//! The toolchain directory is prepended to `PATH` and the depot_tools
//! selector variables are set here, once, and handed to every invocation.
//! The orchestrator's own process environment is never modified.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{DEFAULT_MSVS_VERSION, DEFAULT_WIN_TOOLCHAIN};

pub const WIN_TOOLCHAIN_VAR: &str = "DEPOT_TOOLS_WIN_TOOLCHAIN";
pub const MSVS_VERSION_VAR: &str = "GYP_MSVS_VERSION";

#[derive(Debug, Clone)]
pub struct ExecContext {
  path_prefix: Vec<PathBuf>,
  base_path: Option<OsString>,
  vars: BTreeMap<String, String>,
}

impl ExecContext {
  /// Build a context with the given `PATH` prefix on top of `base_path`.
  pub fn new(path_prefix: Vec<PathBuf>, base_path: Option<OsString>) -> Self {
    Self {
      path_prefix,
      base_path,
      vars: BTreeMap::new(),
    }
  }

  /// Snapshot the current process environment for a run using `toolchain_dir`.
  ///
  /// `DEPOT_TOOLS_WIN_TOOLCHAIN` and `GYP_MSVS_VERSION` keep their values when
  /// set and get defaults otherwise.
  pub fn from_env(toolchain_dir: &Path) -> Self {
    let win_toolchain = env::var(WIN_TOOLCHAIN_VAR).unwrap_or_else(|_| DEFAULT_WIN_TOOLCHAIN.to_string());
    let msvs_version = env::var(MSVS_VERSION_VAR).unwrap_or_else(|_| DEFAULT_MSVS_VERSION.to_string());

    debug!(
      toolchain = %toolchain_dir.display(),
      win_toolchain = %win_toolchain,
      msvs_version = %msvs_version,
      "resolved execution context"
    );

    Self::new(vec![toolchain_dir.to_path_buf()], env::var_os("PATH"))
      .with_var(WIN_TOOLCHAIN_VAR, win_toolchain)
      .with_var(MSVS_VERSION_VAR, msvs_version)
  }

  pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.vars.insert(key.into(), value.into());
    self
  }

  pub fn var(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Directories searched for programs, prefix first.
  pub fn search_dirs(&self) -> Vec<PathBuf> {
    let mut dirs = self.path_prefix.clone();
    if let Some(base) = &self.base_path {
      dirs.extend(env::split_paths(base));
    }
    dirs
  }

  /// The `PATH` value children see.
  pub fn path_value(&self) -> Result<OsString, env::JoinPathsError> {
    env::join_paths(self.search_dirs())
  }

  /// Resolve a bare program name against the context's `PATH`.
  ///
  /// Falls back to the bare name so the OS lookup produces the error.
  pub fn resolve_program(&self, program: &str) -> PathBuf {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
      return as_path.to_path_buf();
    }

    self
      .search_dirs()
      .into_iter()
      .map(|dir| dir.join(program))
      .find(|candidate| candidate.is_file())
      .unwrap_or_else(|| as_path.to_path_buf())
  }
}
