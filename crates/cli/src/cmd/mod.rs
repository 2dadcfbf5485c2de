mod build;
mod info;
mod plan;
mod version;

pub use build::cmd_build;
pub use info::cmd_info;
pub use plan::cmd_plan;
pub use version::cmd_version;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use v8pack_lib::config::{BuildConfig, ConfigFile, Toolchain, discover_config};
use v8pack_lib::platform::arch::TargetCpu;
use v8pack_lib::platform::os::Os;

use crate::prompts::interactive_config;

/// Flags that select what to build. Each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
  /// Config file (default: ./v8pack.toml, then the user config directory)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Workspace root (default: current directory)
  #[arg(long)]
  pub root: Option<PathBuf>,

  /// Build the full matrix and package a release
  #[arg(long)]
  pub all: bool,

  /// Debug build (single-cell mode)
  #[arg(long)]
  pub debug: bool,

  /// Release build (single-cell mode), overriding `debug = true` in the config
  #[arg(long, conflicts_with = "debug")]
  pub release: bool,

  /// Target CPU (single-cell mode): x64, x86 or arm64
  #[arg(long)]
  pub cpu: Option<TargetCpu>,

  /// Compiler: clang or msvc (Windows only)
  #[arg(long)]
  pub toolchain: Option<Toolchain>,

  /// Build v8_base_without_compiler instead of the monolithic library
  #[arg(long)]
  pub no_monolithic: bool,

  /// Git revision to check out on first fetch
  #[arg(long)]
  pub revision: Option<String>,
}

impl SelectionArgs {
  /// Only flags that were given; unset ones leave the file's values alone.
  fn overrides(&self) -> ConfigFile {
    ConfigFile {
      root: self.root.clone(),
      full_matrix: self.all.then_some(true),
      debug: if self.release { Some(false) } else { self.debug.then_some(true) },
      target_cpu: self.cpu,
      toolchain: self.toolchain,
      monolithic: self.no_monolithic.then_some(false),
      revision: self.revision.clone(),
      gn_args: Default::default(),
    }
  }
}

pub(crate) fn host_os() -> Result<Os> {
  match Os::current() {
    Some(os) => Ok(os),
    None => bail!("Unsupported host operating system: {}", std::env::consts::OS),
  }
}

/// Load the config file (if any), apply prompts and flags, and validate.
pub(crate) fn resolve_config(selection: &SelectionArgs, interactive: bool, os: Os) -> Result<BuildConfig> {
  let cwd = std::env::current_dir().context("Failed to determine current directory")?;

  let file = match discover_config(selection.config.as_deref(), &cwd) {
    Some(path) => {
      tracing::debug!(path = %path.display(), "using config file");
      ConfigFile::load(&path)?
    }
    None => ConfigFile::default(),
  };

  let file = if interactive { interactive_config(file, os)? } else { file };

  let config = file.merge(selection.overrides()).resolve(os)?;
  Ok(config)
}
