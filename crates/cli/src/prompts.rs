use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};

use v8pack_lib::config::{ConfigFile, Toolchain};
use v8pack_lib::platform::arch::TargetCpu;
use v8pack_lib::platform::os::Os;

/// Ask for build settings on the terminal, starting from `base`.
pub fn interactive_config(base: ConfigFile, os: Os) -> Result<ConfigFile> {
  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for build settings in non-interactive mode. Pass flags or a config file instead.");
  }
  let stdin = io::stdin();
  ask_config(&mut stdin.lock(), &mut io::stderr(), base, os)
}

/// Prompt through `input`/`out`. An empty answer keeps the value from `base`.
pub fn ask_config<R: BufRead, W: Write>(input: &mut R, out: &mut W, base: ConfigFile, os: Os) -> Result<ConfigFile> {
  let full_matrix = ask_bool(
    input,
    out,
    "Build the full matrix and package a release?",
    base.full_matrix.unwrap_or(false),
  )?;

  let mut answers = ConfigFile {
    full_matrix: Some(full_matrix),
    ..ConfigFile::default()
  };

  if !full_matrix {
    answers.debug = Some(ask_bool(input, out, "Debug build?", base.debug.unwrap_or(false))?);

    let cpus: Vec<&str> = os.matrix_cpus().iter().map(|cpu| cpu.as_str()).collect();
    let default_cpu = base.target_cpu.unwrap_or(TargetCpu::X64);
    let cpu = ask_choice(input, out, "Target CPU", &cpus, default_cpu.as_str())?;
    answers.target_cpu = Some(cpu.parse()?);
  }

  if os == Os::Windows {
    let default_toolchain = base.toolchain.unwrap_or_default().to_string();
    let toolchain = ask_choice(input, out, "Toolchain", &["clang", "msvc"], &default_toolchain)?;
    answers.toolchain = Some(toolchain.parse::<Toolchain>()?);
  }

  Ok(base.merge(answers))
}

fn ask_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<String> {
  write!(out, "{} ", prompt)?;
  out.flush()?;

  let mut line = String::new();
  if input.read_line(&mut line)? == 0 {
    bail!("Input closed while waiting for an answer");
  }
  Ok(line.trim().to_string())
}

fn ask_bool<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str, default: bool) -> Result<bool> {
  let hint = if default { "[Y/n]" } else { "[y/N]" };
  loop {
    let answer = ask_line(input, out, &format!("{} {}", question, hint))?;
    match answer.to_ascii_lowercase().as_str() {
      "" => return Ok(default),
      "y" | "yes" => return Ok(true),
      "n" | "no" => return Ok(false),
      _ => writeln!(out, "Please answer y or n.")?,
    }
  }
}

fn ask_choice<R: BufRead, W: Write>(
  input: &mut R,
  out: &mut W,
  question: &str,
  choices: &[&str],
  default: &str,
) -> Result<String> {
  loop {
    let answer = ask_line(input, out, &format!("{} ({}) [{}]", question, choices.join("/"), default))?;
    if answer.is_empty() {
      return Ok(default.to_string());
    }
    if let Some(choice) = choices.iter().find(|c| c.eq_ignore_ascii_case(&answer)) {
      return Ok(choice.to_string());
    }
    writeln!(out, "Please choose one of: {}", choices.join(", "))?;
  }
}
