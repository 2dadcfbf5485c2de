//! Where a cell's build output lives, and how we know it is current.
//!
//! A cell is complete when its static library exists *and* the fingerprint
//! written beside it matches the arguments and source revision of this run.
//! A library without a fingerprint, from an interrupted copy or an older
//! configuration, is rebuilt.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{ARTIFACT_SUBDIR, FINGERPRINT_EXTENSION, OUT_DIR_PREFIX};
use crate::matrix::cell::{BuildType, MatrixCell};
use crate::platform::arch::TargetCpu;
use crate::util::hash::Fingerprint;

/// gn output directory, relative to the checkout: `out.gn/<cpu>.<debug|release>`.
pub fn out_dir_name(cpu: TargetCpu, debug: bool) -> String {
  format!(
    "{}/{}.{}",
    OUT_DIR_PREFIX,
    cpu.as_str(),
    BuildType::from_debug(debug).suffix()
  )
}

/// The expected output of one cell inside the source checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
  /// gn output directory relative to the checkout.
  pub out_dir: String,
  pub file_name: String,
  /// Absolute path of the library.
  pub path: PathBuf,
}

impl ArtifactLocation {
  pub fn new(source_dir: &Path, cell: &MatrixCell, stem: &str) -> Self {
    let out_dir = out_dir_name(cell.cpu, cell.build_type.is_debug());
    let file_name = cell.os.static_lib_name(stem);
    let path = source_dir.join(&out_dir).join(ARTIFACT_SUBDIR).join(&file_name);
    Self {
      out_dir,
      file_name,
      path,
    }
  }

  pub fn fingerprint_path(&self) -> PathBuf {
    fingerprint_path(&self.path)
  }

  /// True when the library exists and was built from `expected`.
  pub fn is_current(&self, expected: &Fingerprint) -> bool {
    if !self.path.is_file() {
      return false;
    }
    match read_fingerprint(&self.path) {
      Some(actual) if actual == *expected => true,
      Some(actual) => {
        debug!(path = %self.path.display(), expected = %expected, actual = %actual, "stale artifact");
        false
      }
      None => {
        debug!(path = %self.path.display(), "artifact has no fingerprint");
        false
      }
    }
  }
}

/// `<artifact>.fingerprint`
pub fn fingerprint_path(artifact: &Path) -> PathBuf {
  let mut name = artifact.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".");
  name.push(FINGERPRINT_EXTENSION);
  artifact.with_file_name(name)
}

pub fn read_fingerprint(artifact: &Path) -> Option<Fingerprint> {
  let content = fs::read_to_string(fingerprint_path(artifact)).ok()?;
  let trimmed = content.trim();
  (!trimmed.is_empty()).then(|| Fingerprint(trimmed.to_string()))
}

pub fn write_fingerprint(artifact: &Path, fingerprint: &Fingerprint) -> io::Result<()> {
  fs::write(fingerprint_path(artifact), format!("{}\n", fingerprint))
}
