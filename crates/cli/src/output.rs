//! Terminal output for v8pack.
//!
//! Text mode prints one line per matrix cell, prefixed with `+` when the cell
//! is (or would be) built and `=` when its artifact is already current.
//! JSON mode prints the command's report as a single pretty-printed document.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use v8pack_lib::matrix::{CellOutcome, CellStatus, PlannedCell};
use v8pack_lib::package::ReleaseInfo;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const BUILT: &str = "+";
const CURRENT: &str = "=";

/// Fingerprints are shown abbreviated, like git revisions.
const SHORT_FINGERPRINT: usize = 10;

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

pub fn print_error(message: &str) {
  eprintln!("{}", message.if_supports_color(Stream::Stderr, |s| s.red()));
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    "warning:".if_supports_color(Stream::Stderr, |s| s.yellow()),
    message
  );
}

/// An indented `label: value` line.
pub fn print_field(label: &str, value: &str) {
  println!(
    "  {} {}",
    format!("{:<16}", format!("{}:", label)).if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

fn print_cell_line(current: bool, cell: &str, detail: &str) {
  let marker = if current {
    CURRENT.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string()
  } else {
    BUILT.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
  };
  println!(
    "  {} {:<20} {}",
    marker,
    cell,
    detail.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// A cell after `build`: how long it took, or that it was already current.
pub fn print_outcome(outcome: &CellOutcome) {
  let current = outcome.status == CellStatus::Cached;
  let detail = if current {
    "current".to_string()
  } else {
    format!("built in {}", format_elapsed(outcome.elapsed))
  };
  print_cell_line(current, &outcome.cell.to_string(), &detail);
}

/// A cell before `build`: its gn output directory and input fingerprint.
pub fn print_planned(planned: &PlannedCell) {
  let detail = format!("{} @ {}", planned.out_dir, short_fingerprint(&planned.fingerprint.0));
  print_cell_line(planned.cached, &planned.cell.to_string(), &detail);
}

pub fn print_release(release: &ReleaseInfo) {
  let size = std::fs::metadata(&release.archive).map(|m| m.len()).unwrap_or(0);
  println!(
    "{} v{} ({} files, {})",
    "release".if_supports_color(Stream::Stdout, |s| s.green()),
    release.version,
    release.files,
    format_size(size)
  );
  print_field("archive", &release.archive.display().to_string());
  print_field("sha256", &release.sha256.to_string());
}

fn short_fingerprint(fingerprint: &str) -> &str {
  &fingerprint[..fingerprint.len().min(SHORT_FINGERPRINT)]
}

/// Build times range from seconds for a cached link to hours for a cold build.
pub fn format_elapsed(elapsed: Duration) -> String {
  let secs = elapsed.as_secs();
  if secs >= 3600 {
    format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
  } else if secs >= 60 {
    format!("{}m{:02}s", secs / 60, secs % 60)
  } else {
    format!("{:.1}s", elapsed.as_secs_f64())
  }
}

pub fn format_size(bytes: u64) -> String {
  const KIB: f64 = 1024.0;
  const MIB: f64 = KIB * 1024.0;

  let value = bytes as f64;
  if value >= MIB {
    format!("{:.1} MiB", value / MIB)
  } else if value >= KIB {
    format!("{:.1} KiB", value / KIB)
  } else {
    format!("{} B", bytes)
  }
}
