//! Running external tools.
//!
//! Children inherit the orchestrator's stdin, stdout and stderr so long gn,
//! ninja and gclient runs stream straight to the terminal. Their environment
//! comes from the [`ExecContext`], never from mutating our own.

use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::context::ExecContext;
use super::types::{ExecuteError, Invocation};

/// Something that can run an [`Invocation`] to completion.
///
/// The pipeline only talks to external tools through this trait.
pub trait Runner {
  fn run(&self, invocation: &Invocation, ctx: &ExecContext) -> impl Future<Output = Result<(), ExecuteError>> + Send;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
  async fn run(&self, invocation: &Invocation, ctx: &ExecContext) -> Result<(), ExecuteError> {
    info!(cmd = %invocation, cwd = %invocation.cwd.display(), "running");

    let program = ctx.resolve_program(&invocation.program);
    let mut command = Command::new(&program);
    command
      .args(&invocation.args)
      .current_dir(&invocation.cwd)
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit());

    match ctx.path_value() {
      Ok(path) => {
        command.env("PATH", path);
      }
      Err(e) => debug!(error = %e, "toolchain dir not representable in PATH, leaving it unchanged"),
    }
    for (key, value) in ctx.vars() {
      command.env(key, value);
    }

    debug!(program = %program.display(), "spawning process");

    let mut child = command.spawn().map_err(|source| ExecuteError::Spawn {
      program: invocation.program.clone(),
      source,
    })?;
    let status = child.wait().await?;

    if !status.success() {
      return Err(ExecuteError::CmdFailed {
        cmd: invocation.to_string(),
        code: status.code(),
      });
    }

    debug!(cmd = %invocation, "command finished");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::shell_invocation;
  use tempfile::TempDir;

  fn empty_ctx() -> ExecContext {
    ExecContext::new(Vec::new(), std::env::var_os("PATH"))
  }

  #[tokio::test]
  async fn successful_command() {
    let temp = TempDir::new().unwrap();
    let inv = shell_invocation("exit 0", temp.path());

    ProcessRunner.run(&inv, &empty_ctx()).await.unwrap();
  }

  #[tokio::test]
  async fn nonzero_exit_is_reported_with_code() {
    let temp = TempDir::new().unwrap();
    let inv = shell_invocation("exit 3", temp.path());

    let result = ProcessRunner.run(&inv, &empty_ctx()).await;

    assert!(matches!(result, Err(ExecuteError::CmdFailed { code: Some(3), .. })));
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let temp = TempDir::new().unwrap();
    let inv = Invocation::new("v8pack-no-such-tool", temp.path());

    let result = ProcessRunner.run(&inv, &empty_ctx()).await;

    assert!(matches!(result, Err(ExecuteError::Spawn { .. })));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn context_vars_reach_the_child() {
    let temp = TempDir::new().unwrap();
    let ctx = empty_ctx().with_var("GYP_MSVS_VERSION", "2019");
    let inv = shell_invocation("test \"$GYP_MSVS_VERSION\" = 2019", temp.path());

    ProcessRunner.run(&inv, &ctx).await.unwrap();
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn toolchain_dir_is_on_child_path() {
    let temp = TempDir::new().unwrap();
    let tools = temp.path().join("depot_tools");
    std::fs::create_dir(&tools).unwrap();
    let ctx = ExecContext::new(vec![tools.clone()], std::env::var_os("PATH"));
    let script = format!("case \"$PATH\" in {}*) exit 0;; *) exit 1;; esac", tools.display());

    ProcessRunner
      .run(&shell_invocation(&script, temp.path()), &ctx)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn runs_in_working_directory() {
    let temp = TempDir::new().unwrap();
    let sub_dir = temp.path().join("subdir");
    tokio::fs::create_dir(&sub_dir).await.unwrap();

    let inv = crate::util::testutil::touch_invocation("cwd_marker", &sub_dir);
    ProcessRunner.run(&inv, &empty_ctx()).await.unwrap();

    assert!(sub_dir.join("cwd_marker").exists());
  }
}
