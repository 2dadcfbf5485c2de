//! Implementation of the `v8pack plan` command.
//!
//! Resolves the configuration and reports, per matrix cell, whether a build
//! would run. Nothing is created or executed.

use anyhow::Result;
use serde::Serialize;

use v8pack_lib::exec::{ExecContext, ProcessRunner};
use v8pack_lib::matrix::PlannedCell;
use v8pack_lib::pipeline::Pipeline;

use super::{SelectionArgs, host_os, resolve_config};
use crate::output::{OutputFormat, print_field, print_json, print_planned};

#[derive(Serialize)]
struct PlanOutput<'a> {
  root: &'a std::path::Path,
  full_matrix: bool,
  cells: &'a [PlannedCell],
}

pub fn cmd_plan(selection: &SelectionArgs, output: OutputFormat) -> Result<()> {
  let os = host_os()?;
  let config = resolve_config(selection, false, os)?;
  let paths_root = config.root.clone();

  let ctx = ExecContext::new(Vec::new(), None);
  let runner = ProcessRunner;
  let cells = Pipeline::new(&config, os, &ctx, &runner).plan()?;

  if output.is_json() {
    return print_json(&PlanOutput {
      root: &paths_root,
      full_matrix: config.full_matrix,
      cells: &cells,
    });
  }

  println!("workspace {}", paths_root.display());
  for planned in &cells {
    print_planned(planned);
  }
  println!();

  let to_build = cells.iter().filter(|c| !c.cached).count();
  print_field("to build", &to_build.to_string());
  print_field("current", &(cells.len() - to_build).to_string());
  if config.full_matrix {
    print_field("release", "packaged after the build");
  }

  Ok(())
}
