//! Implementation of the `v8pack info` command.
//!
//! Shows the host, the resolved workspace and the environment depot_tools
//! would run with. Nothing is created or executed.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::json;

use v8pack_lib::bootstrap::toolchain_present;
use v8pack_lib::exec::ExecContext;
use v8pack_lib::matrix::cell::{full_matrix, requested_cells};
use v8pack_lib::platform::platform_triple;
use v8pack_lib::workspace::WorkspacePaths;

use super::{SelectionArgs, host_os, resolve_config};
use crate::output::{OutputFormat, print_field, print_json};

pub fn cmd_info(selection: &SelectionArgs, output: OutputFormat) -> Result<()> {
  let os = host_os()?;
  let config = resolve_config(selection, false, os)?;
  let paths = WorkspacePaths::new(&config.root);
  let ctx = ExecContext::from_env(&paths.toolchain_dir());

  let matrix: Vec<String> = full_matrix(os).iter().map(ToString::to_string).collect();
  let requested: Vec<String> = requested_cells(&config, os).iter().map(ToString::to_string).collect();
  let env: BTreeMap<&str, &str> = ctx.vars().collect();
  let toolchain_ready = toolchain_present(&paths);

  if output.is_json() {
    return print_json(&json!({
      "platform": platform_triple(),
      "os": os.as_str(),
      "version": env!("CARGO_PKG_VERSION"),
      "root": paths.root(),
      "toolchain_dir": paths.toolchain_dir(),
      "toolchain_ready": toolchain_ready,
      "matrix": matrix,
      "requested": requested,
      "env": env,
    }));
  }

  println!("v8pack v{}", env!("CARGO_PKG_VERSION"));
  print_field(
    "platform",
    &platform_triple().unwrap_or_else(|| "could not detect".to_string()),
  );
  print_field("workspace", &paths.root().display().to_string());
  print_field(
    "depot_tools",
    &format!(
      "{} ({})",
      paths.toolchain_dir().display(),
      if toolchain_ready { "ready" } else { "not installed" }
    ),
  );
  print_field("full matrix", &matrix.join(", "));
  print_field("requested", &requested.join(", "));
  for (key, value) in env {
    print_field(key, value);
  }
  Ok(())
}
