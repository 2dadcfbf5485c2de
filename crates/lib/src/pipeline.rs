//! End-to-end orchestration.
//!
//! Stages run strictly in order and the first failure stops the run:
//!
//! 1. create the workspace layout
//! 2. install depot_tools, unless present
//! 3. fetch and sync the checkout, unless present
//! 4. stage public headers
//! 5. build the requested matrix cells
//! 6. full matrix only: read the version and package a release

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ToolchainSource, install_toolchain, toolchain_present};
use crate::config::BuildConfig;
use crate::consts::VERSION_HEADER;
use crate::exec::{ExecContext, Runner};
use crate::matrix::cell::requested_cells;
use crate::matrix::{CellOutcome, MatrixError, MatrixExecutor, PlannedCell};
use crate::package::{PackageError, ReleaseInfo, package_release};
use crate::platform::os::Os;
use crate::source::{SourceError, UNKNOWN_REVISION, copy_headers, fetch_source, source_present, source_revision};
use crate::version::{self, Version, VersionError};
use crate::workspace::{LayoutError, WorkspacePaths, ensure_layout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Layout,
  Bootstrap,
  Fetch,
  Headers,
  Build,
  Version,
  Package,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Layout => "layout",
      Stage::Bootstrap => "bootstrap",
      Stage::Fetch => "fetch",
      Stage::Headers => "headers",
      Stage::Build => "build",
      Stage::Version => "version",
      Stage::Package => "package",
    };
    write!(f, "{}", name)
  }
}

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("layout: {0}")]
  Layout(#[from] LayoutError),

  #[error("bootstrap: {0}")]
  Bootstrap(#[from] BootstrapError),

  #[error("fetch: {0}")]
  Fetch(#[source] SourceError),

  #[error("headers: {0}")]
  Headers(#[source] SourceError),

  #[error("build: {0}")]
  Matrix(#[from] MatrixError),

  #[error("version: {0}")]
  Version(#[from] VersionError),

  #[error("package: {0}")]
  Package(#[from] PackageError),
}

impl PipelineError {
  pub fn stage(&self) -> Stage {
    match self {
      PipelineError::Layout(_) => Stage::Layout,
      PipelineError::Bootstrap(_) => Stage::Bootstrap,
      PipelineError::Fetch(_) => Stage::Fetch,
      PipelineError::Headers(_) => Stage::Headers,
      PipelineError::Matrix(_) => Stage::Build,
      PipelineError::Version(_) => Stage::Version,
      PipelineError::Package(_) => Stage::Package,
    }
  }

  /// Exit code of the external tool that failed, if any.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      PipelineError::Bootstrap(BootstrapError::Gclient(e)) => e.exit_code(),
      PipelineError::Fetch(e) | PipelineError::Headers(e) => e.exit_code(),
      PipelineError::Matrix(e) => e.exit_code(),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
  pub root: PathBuf,
  pub revision: String,
  pub cells: Vec<CellOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<Version>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release: Option<ReleaseInfo>,
}

/// Run every stage for `config` on `os`.
pub async fn run_pipeline<R: Runner>(
  config: &BuildConfig,
  os: Os,
  ctx: &ExecContext,
  runner: &R,
) -> Result<PipelineReport, PipelineError> {
  Pipeline::new(config, os, ctx, runner).run().await
}

pub struct Pipeline<'a, R> {
  config: &'a BuildConfig,
  paths: WorkspacePaths,
  os: Os,
  ctx: &'a ExecContext,
  runner: &'a R,
  toolchain: ToolchainSource,
}

impl<'a, R: Runner> Pipeline<'a, R> {
  pub fn new(config: &'a BuildConfig, os: Os, ctx: &'a ExecContext, runner: &'a R) -> Self {
    Self {
      config,
      paths: WorkspacePaths::new(&config.root),
      os,
      ctx,
      runner,
      toolchain: ToolchainSource::default(),
    }
  }

  pub fn with_toolchain_source(mut self, source: ToolchainSource) -> Self {
    self.toolchain = source;
    self
  }

  /// Cells this run would build and whether each is already current.
  /// Nothing is created or executed.
  pub fn plan(&self) -> Result<Vec<PlannedCell>, PipelineError> {
    let revision = self.revision();
    let executor = MatrixExecutor::new(self.config, &self.paths, self.ctx, self.runner, revision);
    Ok(executor.plan_matrix(&requested_cells(self.config, self.os))?)
  }

  pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
    let paths = &self.paths;
    ensure_layout(paths, self.os)?;

    if toolchain_present(paths) {
      info!(dir = %paths.toolchain_dir().display(), "depot_tools present, skipping bootstrap");
    } else {
      install_toolchain(&self.toolchain, paths, self.os, self.ctx, self.runner).await?;
    }

    if source_present(paths) {
      info!(dir = %paths.source_dir().display(), "checkout present, skipping fetch");
    } else {
      fetch_source(paths, self.os, self.config.revision.as_deref(), self.ctx, self.runner)
        .await
        .map_err(PipelineError::Fetch)?;
    }

    copy_headers(paths).map_err(PipelineError::Headers)?;

    let revision = self.revision();
    let cells = requested_cells(self.config, self.os);
    info!(cells = cells.len(), revision = %revision, "building matrix");
    let executor = MatrixExecutor::new(self.config, paths, self.ctx, self.runner, revision.clone());
    let outcomes = executor.run(&cells).await?;

    let (version, release) = if self.config.full_matrix {
      let version = version::extract(&paths.source_dir().join(VERSION_HEADER))?;
      let release = package_release(paths, self.os, &version)?;
      (Some(version), Some(release))
    } else {
      (None, None)
    };

    Ok(PipelineReport {
      root: paths.root().to_path_buf(),
      revision,
      cells: outcomes,
      version,
      release,
    })
  }

  fn revision(&self) -> String {
    let source_dir = self.paths.source_dir();
    if source_dir.is_dir() {
      source_revision(&source_dir)
    } else {
      UNKNOWN_REVISION.to_string()
    }
  }
}
