//! Build matrix execution.
//!
//! Cells run one at a time, in order. For each cell the gn arguments are
//! specialized, the artifact is checked against its fingerprint, `gn gen`
//! and `ninja` run if needed, and the library is copied into the workspace
//! layout. The first failure aborts the whole matrix.

pub mod artifact;
pub mod cell;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BuildConfig, GnArgs, GnValue};
use crate::exec::{ExecContext, ExecuteError, Invocation, Runner};
use crate::util::fs::copy_file;
use crate::util::hash::{Fingerprint, Hashable};
use crate::workspace::WorkspacePaths;

use artifact::{ArtifactLocation, write_fingerprint};
use cell::{BuildType, MatrixCell};

#[derive(Debug, Error)]
pub enum MatrixError {
  #[error("{cell}: gn gen failed: {source}")]
  Generate {
    cell: MatrixCell,
    #[source]
    source: ExecuteError,
  },

  #[error("{cell}: ninja failed: {source}")]
  Compile {
    cell: MatrixCell,
    #[source]
    source: ExecuteError,
  },

  #[error("{cell}: build finished but no artifact at '{path}'")]
  MissingArtifact { cell: MatrixCell, path: PathBuf },

  #[error("{cell}: failed to copy artifact to '{dest}': {source}")]
  Copy {
    cell: MatrixCell,
    dest: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{cell}: failed to record fingerprint: {source}")]
  Fingerprint {
    cell: MatrixCell,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to hash gn arguments: {0}")]
  Hash(#[from] serde_json::Error),
}

impl MatrixError {
  /// Exit code of the tool that failed, if one did.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      MatrixError::Generate { source, .. } | MatrixError::Compile { source, .. } => source.exit_code(),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
  /// gn and ninja ran for this cell.
  Built,
  /// A current artifact was reused.
  Cached,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellOutcome {
  pub cell: MatrixCell,
  pub status: CellStatus,
  /// The copy in the workspace layout.
  pub artifact: PathBuf,
  pub fingerprint: Fingerprint,
  pub elapsed: Duration,
}

/// What would happen to a cell, without running anything.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCell {
  pub cell: MatrixCell,
  pub out_dir: String,
  pub artifact: PathBuf,
  pub fingerprint: Fingerprint,
  pub cached: bool,
}

/// Set the per-cell arguments on a copy of `template`.
pub fn specialize(template: &GnArgs, cell: &MatrixCell) -> GnArgs {
  let mut args = template.clone();
  let cpu = GnValue::str(cell.cpu.as_str());
  args.insert_known("target_cpu", cpu.clone());
  args.insert_known("v8_target_cpu", cpu);
  args.insert_known("is_debug", GnValue::Bool(cell.build_type.is_debug()));
  let symbol_level = match cell.build_type {
    BuildType::Debug => 2,
    BuildType::Release => 0,
  };
  args.insert_known("symbol_level", GnValue::Int(symbol_level));
  args
}

pub struct MatrixExecutor<'a, R> {
  paths: &'a WorkspacePaths,
  ctx: &'a ExecContext,
  runner: &'a R,
  template: GnArgs,
  artifact_stem: &'static str,
  ninja_target: Option<&'static str>,
  revision: String,
}

impl<'a, R: Runner> MatrixExecutor<'a, R> {
  /// `revision` identifies the source checkout and salts every fingerprint.
  pub fn new(
    config: &BuildConfig,
    paths: &'a WorkspacePaths,
    ctx: &'a ExecContext,
    runner: &'a R,
    revision: impl Into<String>,
  ) -> Self {
    Self {
      paths,
      ctx,
      runner,
      template: config.gn_template(),
      artifact_stem: config.artifact_stem(),
      ninja_target: config.ninja_target(),
      revision: revision.into(),
    }
  }

  pub fn plan_matrix(&self, cells: &[MatrixCell]) -> Result<Vec<PlannedCell>, MatrixError> {
    cells
      .iter()
      .map(|cell| {
        let location = ArtifactLocation::new(&self.paths.source_dir(), cell, self.artifact_stem);
        let fingerprint = specialize(&self.template, cell).fingerprint(&self.revision)?;
        Ok(PlannedCell {
          cell: *cell,
          cached: location.is_current(&fingerprint),
          artifact: self.paths.artifact_dest(cell, &location.file_name),
          out_dir: location.out_dir,
          fingerprint,
        })
      })
      .collect()
  }

  /// Build `cells` in order, stopping at the first failure.
  pub async fn run(&self, cells: &[MatrixCell]) -> Result<Vec<CellOutcome>, MatrixError> {
    let mut outcomes = Vec::with_capacity(cells.len());
    for cell in cells {
      outcomes.push(self.build_cell(cell).await?);
    }
    Ok(outcomes)
  }

  async fn build_cell(&self, cell: &MatrixCell) -> Result<CellOutcome, MatrixError> {
    let start = Instant::now();
    let source_dir = self.paths.source_dir();
    let args = specialize(&self.template, cell);
    let fingerprint = args.fingerprint(&self.revision)?;
    let location = ArtifactLocation::new(&source_dir, cell, self.artifact_stem);

    let status = if location.is_current(&fingerprint) {
      info!(cell = %cell, artifact = %location.path.display(), "artifact is current, skipping build");
      CellStatus::Cached
    } else {
      info!(
        cell = %cell,
        cmd = %format!("gn gen {} --args=\"{}\"", location.out_dir, args.to_shell_escaped()),
        "building"
      );

      let gn = Invocation::new(cell.os.tool_name("gn"), &source_dir)
        .arg("gen")
        .arg(&location.out_dir)
        .arg(format!("--args={}", args.to_flag_string()));
      self
        .runner
        .run(&gn, self.ctx)
        .await
        .map_err(|source| MatrixError::Generate { cell: *cell, source })?;

      let mut ninja = Invocation::new(cell.os.tool_name("ninja"), &source_dir)
        .arg("-C")
        .arg(&location.out_dir);
      if let Some(target) = self.ninja_target {
        ninja = ninja.arg(target);
      }
      self
        .runner
        .run(&ninja, self.ctx)
        .await
        .map_err(|source| MatrixError::Compile { cell: *cell, source })?;

      if !location.path.is_file() {
        return Err(MatrixError::MissingArtifact {
          cell: *cell,
          path: location.path,
        });
      }
      write_fingerprint(&location.path, &fingerprint).map_err(|source| MatrixError::Fingerprint {
        cell: *cell,
        source,
      })?;
      CellStatus::Built
    };

    let dest = self.paths.artifact_dest(cell, &location.file_name);
    if dest.exists() {
      warn!(dest = %dest.display(), "overwriting previous artifact");
    }
    copy_file(&location.path, &dest).map_err(|source| MatrixError::Copy {
      cell: *cell,
      dest: dest.clone(),
      source,
    })?;

    Ok(CellOutcome {
      cell: *cell,
      status,
      artifact: dest,
      fingerprint,
      elapsed: start.elapsed(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ConfigFile;
  use crate::matrix::cell::full_matrix;
  use crate::platform::arch::TargetCpu;
  use crate::platform::os::Os;
  use crate::util::testutil::RecordingRunner;
  use tempfile::TempDir;

  const LIB: &str = "libv8_monolith.a";

  fn config(root: &std::path::Path, toml: &str) -> BuildConfig {
    let file = ConfigFile::parse(toml, std::path::Path::new("v8pack.toml")).unwrap();
    ConfigFile {
      root: Some(root.to_path_buf()),
      ..file
    }
    .resolve(Os::Linux)
    .unwrap()
  }

  fn ctx() -> ExecContext {
    ExecContext::new(Vec::new(), None)
  }

  #[test]
  fn specialize_sets_cell_args_without_touching_template() {
    let template = GnArgs::new();
    let debug = specialize(&template, &MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Debug));
    let release = specialize(&template, &MatrixCell::new(Os::Linux, TargetCpu::X86, BuildType::Release));

    assert!(template.is_empty());
    assert_eq!(debug.get("target_cpu"), Some(&GnValue::str("x64")));
    assert_eq!(debug.get("v8_target_cpu"), Some(&GnValue::str("x64")));
    assert_eq!(debug.get("is_debug"), Some(&GnValue::Bool(true)));
    assert_eq!(debug.get("symbol_level"), Some(&GnValue::Int(2)));
    assert_eq!(release.get("target_cpu"), Some(&GnValue::str("x86")));
    assert_eq!(release.get("is_debug"), Some(&GnValue::Bool(false)));
    assert_eq!(release.get("symbol_level"), Some(&GnValue::Int(0)));
  }

  #[tokio::test]
  async fn builds_every_cell_and_copies_artifacts() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "full_matrix = true");
    let paths = WorkspacePaths::new(temp.path());
    let runner = RecordingRunner::new(LIB);
    let ctx = ctx();
    let executor = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1");

    let cells = full_matrix(Os::Linux);
    let outcomes = executor.run(&cells).await.unwrap();

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.status == CellStatus::Built));
    assert_eq!(runner.programs(), vec!["gn", "ninja", "gn", "ninja", "gn", "ninja", "gn", "ninja"]);
    for (outcome, dir) in outcomes
      .iter()
      .zip(["x64/Debug", "x64/Release", "x86/Debug", "x86/Release"])
    {
      let expected = temp.path().join("build/linux").join(dir).join(LIB);
      assert_eq!(outcome.artifact, expected);
      assert!(expected.is_file());
    }
  }

  #[tokio::test]
  async fn gn_and_ninja_arguments() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "debug = true\ntarget_cpu = \"x64\"");
    let paths = WorkspacePaths::new(temp.path());
    let runner = RecordingRunner::new(LIB);
    let ctx = ctx();
    let executor = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1");

    let cell = MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Debug);
    executor.run(&[cell]).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls[0].cwd, paths.source_dir());
    assert_eq!(calls[0].args[0], "gen");
    assert_eq!(calls[0].args[1], "out.gn/x64.debug");
    let flags = calls[0].args[2].strip_prefix("--args=").unwrap();
    assert!(flags.contains("is_debug=true"));
    assert!(flags.contains("target_cpu=\"x64\""));
    assert!(flags.contains("v8_monolithic=true"));
    assert_eq!(calls[1].args, vec!["-C", "out.gn/x64.debug", "v8_monolith"]);
  }

  #[tokio::test]
  async fn current_artifact_skips_gn_and_ninja_but_is_copied() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "");
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let cell = MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Release);

    let first = RecordingRunner::new(LIB);
    MatrixExecutor::new(&config, &paths, &ctx, &first, "rev1")
      .run(&[cell])
      .await
      .unwrap();
    std::fs::remove_file(paths.cell_dir(&cell).join(LIB)).unwrap();

    let second = RecordingRunner::new(LIB);
    let outcomes = MatrixExecutor::new(&config, &paths, &ctx, &second, "rev1")
      .run(&[cell])
      .await
      .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(outcomes[0].status, CellStatus::Cached);
    assert!(paths.cell_dir(&cell).join(LIB).is_file());
  }

  #[tokio::test]
  async fn changed_arguments_or_revision_invalidate_artifact() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let cell = MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Release);

    let base = config(temp.path(), "");
    let runner = RecordingRunner::new(LIB);
    MatrixExecutor::new(&base, &paths, &ctx, &runner, "rev1")
      .run(&[cell])
      .await
      .unwrap();

    let changed = config(temp.path(), "[gn_args]\nv8_enable_i18n_support = false");
    let runner = RecordingRunner::new(LIB);
    MatrixExecutor::new(&changed, &paths, &ctx, &runner, "rev1")
      .run(&[cell])
      .await
      .unwrap();
    assert_eq!(runner.count("gn"), 1);

    let runner = RecordingRunner::new(LIB);
    MatrixExecutor::new(&changed, &paths, &ctx, &runner, "rev2")
      .run(&[cell])
      .await
      .unwrap();
    assert_eq!(runner.count("ninja"), 1);
  }

  #[tokio::test]
  async fn unfingerprinted_artifact_is_rebuilt() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "");
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let cell = MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Debug);

    let stale = paths.source_dir().join("out.gn/x64.debug/obj").join(LIB);
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "left over").unwrap();

    let runner = RecordingRunner::new(LIB);
    let outcomes = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1")
      .run(&[cell])
      .await
      .unwrap();

    assert_eq!(outcomes[0].status, CellStatus::Built);
    assert_eq!(runner.count("ninja"), 1);
  }

  #[tokio::test]
  async fn failure_aborts_remaining_cells() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "full_matrix = true");
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let runner = RecordingRunner::new(LIB).failing("ninja", 2);

    let result = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1")
      .run(&full_matrix(Os::Linux))
      .await;

    let err = result.unwrap_err();
    assert!(matches!(err, MatrixError::Compile { .. }));
    assert_eq!(err.exit_code(), Some(2));
    assert_eq!(runner.programs(), vec!["gn", "ninja"]);
  }

  #[tokio::test]
  async fn missing_output_after_build_is_an_error() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "");
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let runner = RecordingRunner::new("libsomething_else.a");
    let cell = MatrixCell::new(Os::Linux, TargetCpu::X64, BuildType::Debug);

    let result = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1").run(&[cell]).await;

    assert!(matches!(result, Err(MatrixError::MissingArtifact { .. })));
  }

  #[tokio::test]
  async fn plan_reports_cache_state_without_running() {
    let temp = TempDir::new().unwrap();
    let config = config(temp.path(), "full_matrix = true");
    let paths = WorkspacePaths::new(temp.path());
    let ctx = ctx();
    let cells = full_matrix(Os::Linux);

    let runner = RecordingRunner::new(LIB);
    let executor = MatrixExecutor::new(&config, &paths, &ctx, &runner, "rev1");
    executor.run(&cells[..1]).await.unwrap();
    let calls_before = runner.calls().len();

    let plan = executor.plan_matrix(&cells).unwrap();

    assert_eq!(runner.calls().len(), calls_before);
    let cached: Vec<bool> = plan.iter().map(|p| p.cached).collect();
    assert_eq!(cached, vec![true, false, false, false]);
    assert_eq!(plan[3].out_dir, "out.gn/x86.release");
  }
}
