//! Release archive creation.
//!
//! A release bundles the staged headers and every artifact built for one OS:
//!
//! ```text
//! v8-<version>-<os>.zip
//!   include/...
//!   <os>/<cpu>/<Debug|Release>/<library>
//! ```
//!
//! A `<archive>.sha256` file is written next to it.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::consts::INCLUDE_DIR_NAME;
use crate::platform::os::Os;
use crate::util::hash::{Fingerprint, hash_file};
use crate::version::Version;
use crate::workspace::WorkspacePaths;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("nothing to package at '{0}'")]
  MissingInput(PathBuf),

  #[error("failed to walk '{path}': {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("I/O error at '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write archive '{path}': {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseInfo {
  pub archive: PathBuf,
  pub version: String,
  pub sha256: Fingerprint,
  pub files: usize,
}

/// Bundle `build/include` and `build/<os>` into the release archive for
/// `version`. An existing archive is replaced.
pub fn package_release(paths: &WorkspacePaths, os: Os, version: &Version) -> Result<ReleaseInfo, PackageError> {
  let version = version.to_string();
  let archive = paths.release_archive(&version, os);
  let sources = [
    (paths.include_dir(), INCLUDE_DIR_NAME.to_string()),
    (paths.os_build_dir(os), os.as_str().to_string()),
  ];

  let mut entries = Vec::new();
  for (dir, prefix) in &sources {
    if !dir.is_dir() {
      return Err(PackageError::MissingInput(dir.clone()));
    }
    entries.extend(collect_entries(dir, prefix)?);
  }
  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let parent = paths.releases_dir();
  fs::create_dir_all(&parent).map_err(|source| PackageError::Io { path: parent, source })?;

  let partial = archive.with_extension("zip.partial");
  write_archive(&partial, &entries)?;
  fs::rename(&partial, &archive).map_err(|source| PackageError::Io {
    path: archive.clone(),
    source,
  })?;

  let sha256 = hash_file(&archive).map_err(|source| PackageError::Io {
    path: archive.clone(),
    source,
  })?;
  let sidecar = checksum_path(&archive);
  let file_name = archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  fs::write(&sidecar, format!("{}  {}\n", sha256, file_name)).map_err(|source| PackageError::Io {
    path: sidecar.clone(),
    source,
  })?;

  let files = entries.iter().filter(|(_, path)| path.is_some()).count();
  info!(archive = %archive.display(), files, sha256 = %sha256, "release packaged");
  Ok(ReleaseInfo {
    archive,
    version,
    sha256,
    files,
  })
}

/// `<archive>.sha256`
pub fn checksum_path(archive: &Path) -> PathBuf {
  let mut name = archive.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".sha256");
  archive.with_file_name(name)
}

/// (archive name, source file) pairs under `dir`. Directories have no source
/// file and their names end in `/`.
fn collect_entries(dir: &Path, prefix: &str) -> Result<Vec<(String, Option<PathBuf>)>, PackageError> {
  let mut entries = vec![(format!("{}/", prefix), None)];

  for entry in WalkDir::new(dir).min_depth(1).follow_links(true) {
    let entry = entry.map_err(|source| PackageError::Walk {
      path: dir.to_path_buf(),
      source,
    })?;
    let Ok(relative) = entry.path().strip_prefix(dir) else {
      continue;
    };
    let mut name = prefix.to_string();
    for component in relative.components() {
      name.push('/');
      name.push_str(&component.as_os_str().to_string_lossy());
    }

    if entry.file_type().is_dir() {
      name.push('/');
      entries.push((name, None));
    } else {
      entries.push((name, Some(entry.into_path())));
    }
  }

  Ok(entries)
}

fn write_archive(path: &Path, entries: &[(String, Option<PathBuf>)]) -> Result<(), PackageError> {
  let zip_err = |source| PackageError::Zip {
    path: path.to_path_buf(),
    source,
  };
  let file = File::create(path).map_err(|source| PackageError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let mut writer = zip::ZipWriter::new(BufWriter::new(file));
  let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

  for (name, source) in entries {
    match source {
      None => writer.add_directory(name.as_str(), options).map_err(zip_err)?,
      Some(src) => {
        debug!(entry = %name, "adding");
        writer.start_file(name.as_str(), options).map_err(zip_err)?;
        let mut input = File::open(src).map_err(|source| PackageError::Io {
          path: src.clone(),
          source,
        })?;
        io::copy(&mut input, &mut writer).map_err(|source| PackageError::Io {
          path: src.clone(),
          source,
        })?;
      }
    }
  }

  let mut inner = writer.finish().map_err(zip_err)?;
  inner.flush().map_err(|source| PackageError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(())
}
