//! Implementation of the `v8pack version` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use v8pack_lib::consts::VERSION_HEADER;
use v8pack_lib::version::extract;
use v8pack_lib::workspace::WorkspacePaths;

use crate::output::{OutputFormat, print_json, print_warning};

pub fn cmd_version(root: Option<&Path>, strict: bool, output: OutputFormat) -> Result<()> {
  let root = match root {
    Some(root) => root.to_path_buf(),
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let paths = WorkspacePaths::new(dunce::simplified(&root));

  let Some(header) = find_header(&paths) else {
    bail!(
      "No {} found in '{}' or '{}'",
      VERSION_HEADER,
      paths.source_dir().display(),
      paths.build_dir().display()
    );
  };

  let version = extract(&header)?;
  let version = if strict { version.require_complete()? } else { version };

  if output.is_json() {
    return print_json(&version);
  }

  if !version.is_complete() {
    print_warning(&format!("Missing from {}: {}", header.display(), version.missing.join(", ")));
  }
  println!("{}", version);
  Ok(())
}

/// The checkout's header, falling back to the staged copy under `build/`.
fn find_header(paths: &WorkspacePaths) -> Option<PathBuf> {
  [paths.source_dir().join(VERSION_HEADER), paths.build_dir().join(VERSION_HEADER)]
    .into_iter()
    .find(|path| path.is_file())
}
