mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::SelectionArgs;
use output::{OutputFormat, print_error};

/// v8pack - build and package V8 static libraries
#[derive(Parser)]
#[command(name = "v8pack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, build and (with --all) package V8
  Build {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Ask for build settings on the terminal
    #[arg(short, long)]
    interactive: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show which matrix cells would be built and which are current
  Plan {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Print the V8 version of the checkout
  Version {
    /// Workspace root (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Fail if any version component is missing
    #[arg(long)]
    strict: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show host platform and build defaults
  Info {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build {
      selection,
      interactive,
      output,
    } => cmd::cmd_build(&selection, interactive, output),
    Commands::Plan { selection, output } => cmd::cmd_plan(&selection, output),
    Commands::Version { root, strict, output } => cmd::cmd_version(root.as_deref(), strict, output),
    Commands::Info { selection, output } => cmd::cmd_info(&selection, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("error: {:#}", err));
      ExitCode::FAILURE
    }
  }
}
