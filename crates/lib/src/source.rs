//! V8 checkout and header staging.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{FETCH_PACKAGE, INCLUDE_DIR_NAME};
use crate::exec::{ExecContext, ExecuteError, Invocation, Runner};
use crate::platform::os::Os;
use crate::util::fs::copy_dir_all;
use crate::workspace::WorkspacePaths;

/// Revision recorded when the checkout is not a readable git repository.
pub const UNKNOWN_REVISION: &str = "unknown";

const INSTALL_BUILD_DEPS: &str = "build/install-build-deps.sh";

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("fetch {package} failed: {source}")]
  Fetch {
    package: &'static str,
    #[source]
    source: ExecuteError,
  },

  #[error("checkout of revision '{rev}' failed: {source}")]
  Checkout {
    rev: String,
    #[source]
    source: ExecuteError,
  },

  #[error("gclient sync failed: {0}")]
  Sync(#[source] ExecuteError),

  #[error("installing build dependencies failed: {0}")]
  BuildDeps(#[source] ExecuteError),

  #[error("no headers at '{0}'")]
  MissingHeaders(PathBuf),

  #[error("failed to copy headers to '{path}': {source}")]
  CopyHeaders {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl SourceError {
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      SourceError::Fetch { source, .. } | SourceError::Checkout { source, .. } => source.exit_code(),
      SourceError::Sync(source) | SourceError::BuildDeps(source) => source.exit_code(),
      _ => None,
    }
  }
}

/// True once the checkout directory exists. Callers skip fetching then.
pub fn source_present(paths: &WorkspacePaths) -> bool {
  paths.source_dir().is_dir()
}

/// Check out V8 and its dependencies.
///
/// `fetch` creates the checkout inside the fetch directory. When `revision` is
/// set the checkout is moved to it before `gclient sync`, so the synced
/// dependencies match.
pub async fn fetch_source<R: Runner>(
  paths: &WorkspacePaths,
  os: Os,
  revision: Option<&str>,
  ctx: &ExecContext,
  runner: &R,
) -> Result<(), SourceError> {
  let source_dir = paths.source_dir();

  info!(dir = %paths.fetch_dir().display(), "fetching {}", FETCH_PACKAGE);
  let fetch = Invocation::new(os.tool_name("fetch"), &paths.fetch_dir()).arg(FETCH_PACKAGE);
  runner.run(&fetch, ctx).await.map_err(|source| SourceError::Fetch {
    package: FETCH_PACKAGE,
    source,
  })?;

  if let Some(rev) = revision {
    info!(rev, "checking out revision");
    let checkout = Invocation::new("git", &source_dir).arg("checkout").arg(rev);
    runner.run(&checkout, ctx).await.map_err(|source| SourceError::Checkout {
      rev: rev.to_string(),
      source,
    })?;
  }

  info!("syncing dependencies");
  let sync = Invocation::new(os.tool_name("gclient"), &source_dir).arg("sync");
  runner.run(&sync, ctx).await.map_err(SourceError::Sync)?;

  if os.installs_build_deps() {
    info!("installing build dependencies");
    let deps = Invocation::new(source_dir.join(INSTALL_BUILD_DEPS).to_string_lossy(), &source_dir);
    runner.run(&deps, ctx).await.map_err(SourceError::BuildDeps)?;
  }

  Ok(())
}

/// Copy the checkout's public headers to `build/include`.
///
/// Returns `false` without touching anything when the destination exists.
pub fn copy_headers(paths: &WorkspacePaths) -> Result<bool, SourceError> {
  let dest = paths.include_dir();
  if dest.exists() {
    debug!(dest = %dest.display(), "headers already staged");
    return Ok(false);
  }

  let src = paths.source_dir().join(INCLUDE_DIR_NAME);
  if !src.is_dir() {
    return Err(SourceError::MissingHeaders(src));
  }

  let count = copy_dir_all(&src, &dest).map_err(|source| SourceError::CopyHeaders {
    path: dest.clone(),
    source,
  })?;
  info!(files = count, dest = %dest.display(), "copied headers");
  Ok(true)
}

/// HEAD commit of the checkout, or [`UNKNOWN_REVISION`].
pub fn source_revision(source_dir: &Path) -> String {
  match head_commit(source_dir) {
    Ok(rev) => rev,
    Err(e) => {
      warn!(dir = %source_dir.display(), error = %e, "could not resolve source revision");
      UNKNOWN_REVISION.to_string()
    }
  }
}

fn head_commit(dir: &Path) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
  let repo = gix::open(dir)?;
  let mut head = repo.head()?;
  let commit = head.peel_to_commit()?;
  Ok(commit.id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{RecordingRunner, fake_checkout};
  use tempfile::TempDir;

  fn ctx() -> ExecContext {
    ExecContext::new(Vec::new(), None)
  }

  #[tokio::test]
  async fn fetch_then_sync_on_windows() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());
    let runner = RecordingRunner::new("unused");

    fetch_source(&paths, Os::Windows, None, &ctx(), &runner).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "fetch.bat");
    assert_eq!(calls[0].args, vec!["v8"]);
    assert_eq!(calls[0].cwd, paths.fetch_dir());
    assert_eq!(calls[1].program, "gclient.bat");
    assert_eq!(calls[1].args, vec!["sync"]);
    assert_eq!(calls[1].cwd, paths.source_dir());
  }

  #[tokio::test]
  async fn linux_checks_out_revision_and_installs_deps() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());
    let runner = RecordingRunner::new("unused");

    fetch_source(&paths, Os::Linux, Some("12.4.254.21"), &ctx(), &runner)
      .await
      .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[1].program, "git");
    assert_eq!(calls[1].args, vec!["checkout", "12.4.254.21"]);
    assert_eq!(calls[2].args, vec!["sync"]);
    assert!(calls[3].program.ends_with("install-build-deps.sh"));
  }

  #[tokio::test]
  async fn failed_fetch_stops_before_sync() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());
    let runner = RecordingRunner::new("unused").failing("fetch", 1);

    let err = fetch_source(&paths, Os::Linux, None, &ctx(), &runner).await.unwrap_err();

    assert!(matches!(err, SourceError::Fetch { .. }));
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(runner.calls().len(), 1);
  }

  #[test]
  fn copy_headers_once() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());
    fake_checkout(&paths.source_dir());

    assert!(copy_headers(&paths).unwrap());
    assert!(paths.include_dir().join("v8.h").is_file());
    assert!(paths.include_dir().join("cppgc/heap.h").is_file());

    std::fs::write(paths.source_dir().join("include/new.h"), "").unwrap();
    assert!(!copy_headers(&paths).unwrap());
    assert!(!paths.include_dir().join("new.h").exists());
  }

  #[test]
  fn copy_headers_without_checkout() {
    let temp = TempDir::new().unwrap();
    let paths = WorkspacePaths::new(temp.path());

    assert!(matches!(copy_headers(&paths), Err(SourceError::MissingHeaders(_))));
  }

  #[test]
  fn revision_of_non_repository_is_unknown() {
    let temp = TempDir::new().unwrap();
    assert_eq!(source_revision(temp.path()), UNKNOWN_REVISION);
  }

  #[test]
  fn revision_of_empty_repository_is_unknown() {
    let temp = TempDir::new().unwrap();
    gix::init(temp.path()).unwrap();
    assert_eq!(source_revision(temp.path()), UNKNOWN_REVISION);
  }
}
