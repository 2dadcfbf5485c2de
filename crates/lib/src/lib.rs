//! v8pack-lib: building and packaging V8 static libraries.
//!
//! The crate drives Google's own tooling (depot_tools, gn, ninja) through a
//! fixed sequence of stages:
//! - `bootstrap`: install depot_tools into the workspace
//! - `source`: fetch and sync the V8 checkout, stage its headers
//! - `matrix`: build every requested (cpu, build type) cell
//! - `version` / `package`: read the V8 version and zip a release
//!
//! `pipeline` runs them in order against a `config::BuildConfig`.

pub mod bootstrap;
pub mod config;
pub mod consts;
pub mod exec;
pub mod lock;
pub mod matrix;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod source;
pub mod util;
pub mod version;
pub mod workspace;
