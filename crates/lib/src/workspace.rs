//! Workspace layout.
//!
//! Every location v8pack reads or writes is derived from a single root:
//!
//! ```text
//! <root>/
//!   depot_tools/                      toolchain
//!   v8/                               source checkout
//!   build/include/                    public headers
//!   build/<os>/<cpu>/<Debug|Release>/ artifacts
//!   releases/                         zip archives
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{
  BUILD_DIR_NAME, INCLUDE_DIR_NAME, LIBRARY_NAME, LOCK_FILENAME, RELEASES_DIR_NAME, SOURCE_DIR_NAME,
  TOOLCHAIN_DIR_NAME,
};
use crate::matrix::cell::{BuildType, MatrixCell};
use crate::platform::os::Os;

#[derive(Debug, Error)]
#[error("failed to create directory '{path}': {source}")]
pub struct LayoutError {
  pub path: PathBuf,
  #[source]
  pub source: io::Error,
}

/// Resolved workspace locations. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
  root: PathBuf,
}

impl WorkspacePaths {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn toolchain_dir(&self) -> PathBuf {
    self.root.join(TOOLCHAIN_DIR_NAME)
  }

  /// Directory `fetch` runs in; the checkout appears inside it.
  pub fn fetch_dir(&self) -> PathBuf {
    self.root.clone()
  }

  pub fn source_dir(&self) -> PathBuf {
    self.root.join(SOURCE_DIR_NAME)
  }

  pub fn build_dir(&self) -> PathBuf {
    self.root.join(BUILD_DIR_NAME)
  }

  pub fn include_dir(&self) -> PathBuf {
    self.build_dir().join(INCLUDE_DIR_NAME)
  }

  /// Per-OS artifact root, `build/<os>`.
  pub fn os_build_dir(&self, os: Os) -> PathBuf {
    self.build_dir().join(os.as_str())
  }

  /// Artifact directory of one cell, `build/<os>/<cpu>/<Debug|Release>`.
  pub fn cell_dir(&self, cell: &MatrixCell) -> PathBuf {
    self
      .os_build_dir(cell.os)
      .join(cell.cpu.as_str())
      .join(cell.build_type.as_str())
  }

  /// Where the library `file_name` built for `cell` is copied to.
  pub fn artifact_dest(&self, cell: &MatrixCell, file_name: &str) -> PathBuf {
    self.cell_dir(cell).join(file_name)
  }

  pub fn releases_dir(&self) -> PathBuf {
    self.root.join(RELEASES_DIR_NAME)
  }

  /// `releases/v8-<version>-<os>.zip`
  pub fn release_archive(&self, version: &str, os: Os) -> PathBuf {
    self
      .releases_dir()
      .join(format!("{}-{}-{}.zip", LIBRARY_NAME, version, os.as_str()))
  }

  pub fn lock_file(&self) -> PathBuf {
    self.root.join(LOCK_FILENAME)
  }
}

/// Create the artifact tree for every CPU `os` can build, plus the releases
/// directory. Existing directories are left alone.
pub fn ensure_layout(paths: &WorkspacePaths, os: Os) -> Result<(), LayoutError> {
  let mut dirs = vec![paths.releases_dir()];
  for cpu in os.matrix_cpus() {
    for build_type in BuildType::ALL {
      dirs.push(paths.cell_dir(&MatrixCell::new(os, *cpu, build_type)));
    }
  }

  for dir in dirs {
    ensure_dir(&dir)?;
  }
  Ok(())
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<(), LayoutError> {
  if path.is_dir() {
    return Ok(());
  }
  debug!(path = %path.display(), "creating directory");
  fs::create_dir_all(path).map_err(|source| LayoutError {
    path: path.to_path_buf(),
    source,
  })
}
