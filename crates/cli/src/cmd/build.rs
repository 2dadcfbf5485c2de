//! Implementation of the `v8pack build` command.
//!
//! Runs the whole pipeline against the resolved configuration while holding
//! the workspace lock, then prints what was built.

use anyhow::{Context, Result, anyhow};
use tracing::info;

use v8pack_lib::exec::{ExecContext, ProcessRunner};
use v8pack_lib::lock::{LockHolder, WorkspaceLock};
use v8pack_lib::matrix::CellStatus;
use v8pack_lib::pipeline::{PipelineReport, run_pipeline};
use v8pack_lib::workspace::WorkspacePaths;

use super::{SelectionArgs, host_os, resolve_config};
use crate::output::{OutputFormat, print_field, print_json, print_outcome, print_release};

pub fn cmd_build(selection: &SelectionArgs, interactive: bool, output: OutputFormat) -> Result<()> {
  let os = host_os()?;
  let config = resolve_config(selection, interactive, os)?;
  let paths = WorkspacePaths::new(&config.root);

  let _lock = WorkspaceLock::acquire(&paths, &LockHolder::for_build(&config, os))?;

  let ctx = ExecContext::from_env(&paths.toolchain_dir());
  let runner = ProcessRunner;
  info!(root = %paths.root().display(), full_matrix = config.full_matrix, "starting build");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(run_pipeline(&config, os, &ctx, &runner))
    .map_err(|e| {
      let stage = e.stage();
      match e.exit_code() {
        Some(code) => anyhow!(e).context(format!("{} stage failed (exit code {})", stage, code)),
        None => anyhow!(e).context(format!("{} stage failed", stage)),
      }
    })?;

  if output.is_json() {
    return print_json(&report);
  }
  print_report(&report);
  Ok(())
}

fn print_report(report: &PipelineReport) {
  println!();
  for outcome in &report.cells {
    print_outcome(outcome);
  }
  println!();

  let built = report.cells.iter().filter(|c| c.status == CellStatus::Built).count();
  print_field("built", &built.to_string());
  print_field("current", &(report.cells.len() - built).to_string());
  print_field("revision", &report.revision);

  if let Some(release) = &report.release {
    println!();
    print_release(release);
  }
}
