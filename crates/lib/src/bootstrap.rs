//! depot_tools installation.
//!
//! On Windows depot_tools ships as a zip archive that is usable as soon as it
//! is extracted. Everywhere else it is a git clone, and running `gclient` once
//! lets it update itself and pull its bundled python.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{DEPOT_TOOLS_GIT_URL, DEPOT_TOOLS_ZIP_URL, TOOLCHAIN_READY_MARKER};
use crate::exec::{ExecContext, ExecuteError, Invocation, Runner};
use crate::platform::os::Os;
use crate::workspace::WorkspacePaths;

#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error("failed to download '{url}': {source}")]
  Download {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to download '{url}': HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("failed to extract '{path}': {source}")]
  Extract {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("failed to clone '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("gclient failed: {0}")]
  Gclient(#[source] ExecuteError),

  #[error("I/O error at '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl BootstrapError {
  fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
    move |source| BootstrapError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Where depot_tools is obtained from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSource {
  pub archive_url: String,
  pub git_url: String,
}

impl Default for ToolchainSource {
  fn default() -> Self {
    Self {
      archive_url: DEPOT_TOOLS_ZIP_URL.to_string(),
      git_url: DEPOT_TOOLS_GIT_URL.to_string(),
    }
  }
}

/// True once depot_tools was installed and configured completely. A directory
/// left behind by an interrupted or failed install does not count.
pub fn toolchain_present(paths: &WorkspacePaths) -> bool {
  paths.toolchain_dir().join(TOOLCHAIN_READY_MARKER).is_file()
}

/// Install depot_tools into `paths.toolchain_dir()` the way `os` expects.
///
/// Leftovers of an earlier incomplete install are removed first. The ready
/// marker is written last, so any failure leaves the toolchain absent.
pub async fn install_toolchain<R: Runner>(
  source: &ToolchainSource,
  paths: &WorkspacePaths,
  os: Os,
  ctx: &ExecContext,
  runner: &R,
) -> Result<(), BootstrapError> {
  let dest = paths.toolchain_dir();
  if dest.exists() {
    warn!(dir = %dest.display(), "removing incomplete depot_tools install");
    remove_dir(&dest)?;
  }

  let origin = if os.uses_toolchain_archive() {
    info!(url = %source.archive_url, dest = %dest.display(), "installing depot_tools from archive");
    let count = install_from_archive(&source.archive_url, paths.root(), &dest).await?;
    info!(files = count, "depot_tools extracted");
    &source.archive_url
  } else {
    info!(url = %source.git_url, dest = %dest.display(), "cloning depot_tools");
    let head = clone_toolchain(&source.git_url, &dest).await?;
    debug!(rev = %head, "depot_tools cloned");
    configure_toolchain(&dest, os, ctx, runner).await?;
    &source.git_url
  };

  let marker = dest.join(TOOLCHAIN_READY_MARKER);
  fs::write(&marker, format!("{}\n", origin)).map_err(BootstrapError::io(&marker))?;
  Ok(())
}

/// Run `gclient` once without arguments so a fresh clone updates itself and
/// pulls its bundled python.
pub async fn configure_toolchain<R: Runner>(
  dir: &Path,
  os: Os,
  ctx: &ExecContext,
  runner: &R,
) -> Result<(), BootstrapError> {
  let gclient = Invocation::new(os.tool_name("gclient"), dir);
  runner.run(&gclient, ctx).await.map_err(BootstrapError::Gclient)
}

/// Download the zip at `url` into `download_dir` and extract it into `dest`,
/// which must not exist yet. Returns the number of files extracted.
///
/// Entries land in a `.partial` sibling that is renamed to `dest` only after
/// every entry was written. The downloaded archive is deleted either way.
pub async fn install_from_archive(url: &str, download_dir: &Path, dest: &Path) -> Result<usize, BootstrapError> {
  let archive = download_dir.join(archive_file_name(url));
  let staging = staging_dir(dest);

  let result = unpack_download(url, &archive, &staging, dest).await;

  let removed = match fs::remove_file(&archive) {
    Ok(()) => {
      debug!(path = %archive.display(), "removed downloaded archive");
      Ok(())
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(BootstrapError::Io {
      path: archive.clone(),
      source: e,
    }),
  };

  match result {
    Ok(count) => removed.map(|()| count),
    Err(err) => {
      if let Err(e) = removed {
        warn!(error = %e, "could not remove downloaded archive");
      }
      if let Err(e) = remove_dir(&staging) {
        warn!(error = %e, "could not remove partial extraction");
      }
      Err(err)
    }
  }
}

async fn unpack_download(url: &str, archive: &Path, staging: &Path, dest: &Path) -> Result<usize, BootstrapError> {
  download(url, archive).await?;
  remove_dir(staging)?;

  let archive_path = archive.to_path_buf();
  let extract_to = staging.to_path_buf();
  let count = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &extract_to)).await??;

  fs::rename(staging, dest).map_err(BootstrapError::io(dest))?;
  Ok(count)
}

/// `<dest>.partial`, next to `dest`.
fn staging_dir(dest: &Path) -> PathBuf {
  let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
  name.push(".partial");
  dest.with_file_name(name)
}

fn remove_dir(path: &Path) -> Result<(), BootstrapError> {
  match fs::remove_dir_all(path) {
    Err(e) if e.kind() != io::ErrorKind::NotFound => Err(BootstrapError::Io {
      path: path.to_path_buf(),
      source: e,
    }),
    _ => Ok(()),
  }
}

/// Fetch `url` into `dest`. Any non-success status is an error.
pub async fn download(url: &str, dest: &Path) -> Result<u64, BootstrapError> {
  let response = reqwest::get(url).await.map_err(|e| BootstrapError::Download {
    url: url.to_string(),
    source: e,
  })?;

  if !response.status().is_success() {
    return Err(BootstrapError::Status {
      url: url.to_string(),
      status: response.status().as_u16(),
    });
  }

  let bytes = response.bytes().await.map_err(|e| BootstrapError::Download {
    url: url.to_string(),
    source: e,
  })?;

  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).map_err(BootstrapError::io(parent))?;
  }
  let mut file = File::create(dest).map_err(BootstrapError::io(dest))?;
  file.write_all(&bytes).map_err(BootstrapError::io(dest))?;
  file.flush().map_err(BootstrapError::io(dest))?;

  info!(path = %dest.display(), size = bytes.len(), "download complete");
  Ok(bytes.len() as u64)
}

/// Extract every entry of `archive` under `dest`, keeping the archive's own
/// layout. Entries escaping `dest` are rejected.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, BootstrapError> {
  let file = File::open(archive).map_err(BootstrapError::io(archive))?;
  let zip_err = |source| BootstrapError::Extract {
    path: archive.to_path_buf(),
    source,
  };
  let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;

  fs::create_dir_all(dest).map_err(BootstrapError::io(dest))?;
  let mut count = 0;
  for i in 0..zip.len() {
    let mut entry = zip.by_index(i).map_err(zip_err)?;
    let Some(relative) = entry.enclosed_name() else {
      return Err(zip_err(zip::result::ZipError::InvalidArchive("entry escapes destination".into())));
    };
    let out_path = dest.join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&out_path).map_err(BootstrapError::io(&out_path))?;
      continue;
    }

    if let Some(parent) = out_path.parent() {
      fs::create_dir_all(parent).map_err(BootstrapError::io(parent))?;
    }
    let mut out = File::create(&out_path).map_err(BootstrapError::io(&out_path))?;
    io::copy(&mut entry, &mut out).map_err(BootstrapError::io(&out_path))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).map_err(BootstrapError::io(&out_path))?;
      }
    }
    count += 1;
  }

  Ok(count)
}

/// Clone `url` into `dest` and return the checked out commit.
pub async fn clone_toolchain(url: &str, dest: &Path) -> Result<String, BootstrapError> {
  let url = url.to_string();
  let dest = dest.to_path_buf();
  tokio::task::spawn_blocking(move || clone_repo(&url, &dest)).await?
}

fn clone_repo(url: &str, dest: &Path) -> Result<String, BootstrapError> {
  let clone_err = |e: Box<dyn std::error::Error + Send + Sync>| BootstrapError::Clone {
    url: url.to_string(),
    source: e,
  };

  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| clone_err(Box::new(e)))?;
  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;
  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;

  let mut head = repo.head().map_err(|e| clone_err(Box::new(e)))?;
  let commit = head.peel_to_commit().map_err(|e| clone_err(Box::new(e)))?;
  Ok(commit.id.to_string())
}

/// Last path segment of `url`, without query string.
fn archive_file_name(url: &str) -> String {
  url
    .split(['?', '#'])
    .next()
    .and_then(|path| path.rsplit('/').next())
    .filter(|name| !name.is_empty())
    .unwrap_or("download.zip")
    .to_string()
}
