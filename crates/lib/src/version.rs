//! V8 version extraction from `include/v8-version.h`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum VersionError {
  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("version header is missing {}", .0.join(", "))]
  Incomplete(Vec<&'static str>),
}

/// Macro names in the header, in component order.
const COMPONENTS: [&str; 4] = ["V8_MAJOR_VERSION", "V8_MINOR_VERSION", "V8_BUILD_NUMBER", "V8_PATCH_LEVEL"];

/// A four-part V8 version.
///
/// Components absent from the header are 0 and listed in `missing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
  pub major: u32,
  pub minor: u32,
  pub build: u32,
  pub patch: u32,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub missing: Vec<&'static str>,
}

impl Version {
  pub fn parse(content: &str) -> Self {
    let mut values: [Option<u32>; 4] = [None; 4];

    for line in content.lines() {
      let mut tokens = line.split_whitespace();
      while let Some(token) = tokens.next() {
        let Some(idx) = COMPONENTS.iter().position(|name| *name == token) else {
          continue;
        };
        let rest = tokens.by_ref().collect::<Vec<_>>().join(" ");
        match rest.trim().parse::<u32>() {
          Ok(value) => values[idx] = Some(value),
          Err(_) => warn!(component = COMPONENTS[idx], value = %rest.trim(), "non-numeric version component"),
        }
        break;
      }
    }

    let mut missing = Vec::new();
    let mut component = |idx: usize| {
      values[idx].unwrap_or_else(|| {
        warn!(component = COMPONENTS[idx], "version component not found, using 0");
        missing.push(COMPONENTS[idx]);
        0
      })
    };

    let major = component(0);
    let minor = component(1);
    let build = component(2);
    let patch = component(3);
    Version {
      major,
      minor,
      build,
      patch,
      missing,
    }
  }

  /// Fails when any component had to be defaulted.
  pub fn require_complete(self) -> Result<Self, VersionError> {
    if self.missing.is_empty() {
      Ok(self)
    } else {
      Err(VersionError::Incomplete(self.missing))
    }
  }

  pub fn is_complete(&self) -> bool {
    self.missing.is_empty()
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.patch)
  }
}

/// Read and parse the version header at `path`.
pub fn extract(path: &Path) -> Result<Version, VersionError> {
  let content = std::fs::read_to_string(path).map_err(|source| VersionError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(Version::parse(&content))
}
