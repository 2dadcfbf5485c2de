//! External tool execution.
//!
//! Every call to depot_tools, gn or ninja goes through a [`Runner`] with an
//! explicit [`ExecContext`].

pub mod context;
pub mod process;
pub mod types;

pub use context::ExecContext;
pub use process::{ProcessRunner, Runner};
pub use types::{ExecuteError, Invocation};
