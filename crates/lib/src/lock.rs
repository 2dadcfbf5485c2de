//! One build per workspace.
//!
//! Every run in a workspace shares the gn output directories inside the
//! checkout and the artifact tree under `build/`. A build therefore holds an
//! exclusive, non-blocking lock on `<root>/.v8pack.lock` until it finishes.
//! The file also records which cells are being built, so a second invocation
//! can say what it collided with.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::BuildConfig;
use crate::matrix::cell::requested_cells;
use crate::platform::os::Os;
use crate::workspace::WorkspacePaths;

/// The build currently owning a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
  pub pid: u32,
  pub started_at_unix: u64,
  pub full_matrix: bool,
  pub cells: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub revision: Option<String>,
}

impl LockHolder {
  /// This process, about to build `config` on `os`.
  pub fn for_build(config: &BuildConfig, os: Os) -> Self {
    Self {
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default(),
      full_matrix: config.full_matrix,
      cells: requested_cells(config, os).iter().map(ToString::to_string).collect(),
      revision: config.revision.clone(),
    }
  }
}

impl fmt::Display for LockHolder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "pid {} is building {}", self.pid, self.cells.join(", "))?;
    if self.full_matrix {
      write!(f, " for a release")?;
    }
    if let Some(rev) = &self.revision {
      write!(f, " at {}", rev)?;
    }
    write!(f, " (started at unix time {})", self.started_at_unix)
  }
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("workspace '{root}' is busy: {holder}\nremove '{lock_file}' if no v8pack build is running there")]
  Busy {
    root: PathBuf,
    lock_file: PathBuf,
    holder: String,
  },

  #[error("cannot lock workspace at '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Exclusive ownership of a workspace root, released on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
  _file: File,
  path: PathBuf,
}

impl WorkspaceLock {
  /// Claim the workspace at `paths` for `holder`. Fails immediately when
  /// another build owns it.
  pub fn acquire(paths: &WorkspacePaths, holder: &LockHolder) -> Result<Self, LockError> {
    let path = paths.lock_file();
    let io_err = |source| LockError::Io {
      path: path.clone(),
      source,
    };

    fs::create_dir_all(paths.root()).map_err(io_err)?;
    let mut file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&path)
      .map_err(io_err)?;

    match try_lock_exclusive(&file) {
      Ok(()) => {}
      Err(e) if is_contended(&e) => {
        return Err(LockError::Busy {
          root: paths.root().to_path_buf(),
          lock_file: path.clone(),
          holder: current_holder(&mut file),
        });
      }
      Err(e) => return Err(io_err(e)),
    }

    record_holder(&mut file, holder).map_err(io_err)?;
    debug!(path = %path.display(), cells = holder.cells.len(), "workspace locked");
    Ok(Self { _file: file, path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

fn record_holder(file: &mut File, holder: &LockHolder) -> io::Result<()> {
  file.set_len(0)?;
  file.seek(SeekFrom::Start(0))?;
  serde_json::to_writer_pretty(&mut *file, holder).map_err(io::Error::other)?;
  file.flush()
}

/// Who owns the lock, as far as the lock file tells.
fn current_holder(file: &mut File) -> String {
  let mut contents = String::new();
  match file.read_to_string(&mut contents) {
    Ok(_) => match serde_json::from_str::<LockHolder>(&contents) {
      Ok(holder) => holder.to_string(),
      Err(_) => "another process holds the lock but left no build record".to_string(),
    },
    Err(_) => "another process holds the lock".to_string(),
  }
}

#[cfg(unix)]
fn is_contended(err: &io::Error) -> bool {
  err.kind() == io::ErrorKind::WouldBlock
}

#[cfg(windows)]
fn is_contended(err: &io::Error) -> bool {
  use windows_sys::Win32::Foundation::ERROR_LOCK_VIOLATION;
  err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32)
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive).map_err(io::Error::from)
}

/// Windows locks are mandatory, so the locked byte sits at 4 GiB, well past
/// the holder record. Other processes can still read who owns the workspace.
#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};
  use windows_sys::Win32::System::IO::OVERLAPPED;

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is plain data and valid when zeroed; the handle is open
  // for the lifetime of `file`.
  let result = unsafe {
    let mut overlapped: OVERLAPPED = std::mem::zeroed();
    overlapped.Anonymous.Anonymous.OffsetHigh = 1;
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
