//! Test utilities for v8pack-lib.
//!
//! Cross-platform shell helpers plus a [`RecordingRunner`] that stands in for
//! depot_tools, gn and ninja.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::consts::{ARTIFACT_SUBDIR, TOOLCHAIN_READY_MARKER, VERSION_HEADER};
use crate::exec::{ExecContext, ExecuteError, Invocation, Runner};

/// Returns an invocation running `script` through the platform shell.
#[cfg(unix)]
pub fn shell_invocation(script: &str, cwd: &Path) -> Invocation {
  Invocation::new("/bin/sh", cwd).arg("-c").arg(script)
}

#[cfg(windows)]
pub fn shell_invocation(script: &str, cwd: &Path) -> Invocation {
  Invocation::new("cmd.exe", cwd).arg("/C").arg(script)
}

/// Returns an invocation that creates `filename` in `cwd`.
#[cfg(unix)]
pub fn touch_invocation(filename: &str, cwd: &Path) -> Invocation {
  Invocation::new("/usr/bin/touch", cwd).arg(filename)
}

#[cfg(windows)]
pub fn touch_invocation(filename: &str, cwd: &Path) -> Invocation {
  Invocation::new("powershell.exe", cwd)
    .arg("-NoProfile")
    .arg("-Command")
    .arg(format!("New-Item -ItemType File -Path '{}' -Force | Out-Null", filename))
}

/// Records every invocation instead of running it.
///
/// `ninja -C <dir> ...` writes a fake static library named `artifact_name`
/// into `<cwd>/<dir>/obj/`, the way a real build would.
pub struct RecordingRunner {
  calls: Mutex<Vec<Invocation>>,
  artifact_name: String,
  fail_program: Option<(String, i32)>,
}

impl RecordingRunner {
  pub fn new(artifact_name: &str) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      artifact_name: artifact_name.to_string(),
      fail_program: None,
    }
  }

  /// Make every invocation of `program` exit with `code`.
  pub fn failing(mut self, program: &str, code: i32) -> Self {
    self.fail_program = Some((program.to_string(), code));
    self
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn programs(&self) -> Vec<String> {
    self.calls().into_iter().map(|inv| inv.program).collect()
  }

  pub fn count(&self, program: &str) -> usize {
    self.calls().iter().filter(|inv| inv.program == program).count()
  }
}

impl Runner for RecordingRunner {
  async fn run(&self, invocation: &Invocation, _ctx: &ExecContext) -> Result<(), ExecuteError> {
    self.calls.lock().unwrap().push(invocation.clone());

    if let Some((program, code)) = &self.fail_program
      && *program == invocation.program
    {
      return Err(ExecuteError::CmdFailed {
        cmd: invocation.to_string(),
        code: Some(*code),
      });
    }

    if invocation.program == "ninja"
      && let Some(pos) = invocation.args.iter().position(|a| a == "-C")
    {
      let out_dir = invocation.cwd.join(&invocation.args[pos + 1]).join(ARTIFACT_SUBDIR);
      fs::create_dir_all(&out_dir)?;
      fs::write(
        out_dir.join(&self.artifact_name),
        format!("built by {}", invocation),
      )?;
    }

    Ok(())
  }
}

/// A depot_tools directory that finished installing.
pub fn fake_toolchain(dir: &Path) {
  fs::create_dir_all(dir).unwrap();
  fs::write(dir.join(TOOLCHAIN_READY_MARKER), "fake\n").unwrap();
}

/// Lay out a minimal V8 checkout: public headers and a version header.
pub fn fake_checkout(source_dir: &Path) {
  let include = source_dir.join("include");
  fs::create_dir_all(include.join("cppgc")).unwrap();
  fs::write(include.join("v8.h"), "// v8.h\n").unwrap();
  fs::write(include.join("cppgc/heap.h"), "// heap.h\n").unwrap();
  fs::write(
    source_dir.join(VERSION_HEADER),
    "#ifndef V8_INCLUDE_VERSION_H_\n\
     #define V8_INCLUDE_VERSION_H_\n\
     #define V8_MAJOR_VERSION 12\n\
     #define V8_MINOR_VERSION 4\n\
     #define V8_BUILD_NUMBER 254\n\
     #define V8_PATCH_LEVEL 21\n\
     #endif\n",
  )
  .unwrap();
}
