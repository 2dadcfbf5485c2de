//! Typed gn build arguments.
//!
//! Arguments are validated against [`SCHEMA`] on insertion and rendered to the
//! single `--args=` string gn expects. Quoting lives in one place, in the
//! `Display` impl of [`GnValue`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::Hashable;

/// Value kinds gn arguments can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GnKind {
  Bool,
  Int,
  Str,
}

impl fmt::Display for GnKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      GnKind::Bool => "boolean",
      GnKind::Int => "integer",
      GnKind::Str => "string",
    };
    write!(f, "{}", name)
  }
}

/// Every argument v8pack accepts, with its value kind.
pub const SCHEMA: &[(&str, GnKind)] = &[
  ("enable_rust", GnKind::Bool),
  ("is_clang", GnKind::Bool),
  ("is_component_build", GnKind::Bool),
  ("is_debug", GnKind::Bool),
  ("symbol_level", GnKind::Int),
  ("target_cpu", GnKind::Str),
  ("treat_warnings_as_errors", GnKind::Bool),
  ("use_custom_libcxx", GnKind::Bool),
  ("use_lld", GnKind::Bool),
  ("v8_enable_i18n_support", GnKind::Bool),
  ("v8_enable_pointer_compression", GnKind::Bool),
  ("v8_enable_sandbox", GnKind::Bool),
  ("v8_enable_webassembly", GnKind::Bool),
  ("v8_monolithic", GnKind::Bool),
  ("v8_static_library", GnKind::Bool),
  ("v8_target_cpu", GnKind::Str),
  ("v8_use_external_startup_data", GnKind::Bool),
];

/// Look up the declared kind of an argument.
pub fn kind_of(key: &str) -> Option<GnKind> {
  SCHEMA.iter().find(|(name, _)| *name == key).map(|(_, kind)| *kind)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GnArgsError {
  #[error("unknown gn argument '{0}'")]
  UnknownArg(String),

  #[error("gn argument '{key}' expects a {expected}, got a {found}")]
  WrongKind {
    key: String,
    expected: GnKind,
    found: GnKind,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GnValue {
  Bool(bool),
  Int(i64),
  Str(String),
}

impl GnValue {
  pub fn str(value: impl Into<String>) -> Self {
    Self::Str(value.into())
  }

  pub fn kind(&self) -> GnKind {
    match self {
      GnValue::Bool(_) => GnKind::Bool,
      GnValue::Int(_) => GnKind::Int,
      GnValue::Str(_) => GnKind::Str,
    }
  }
}

impl fmt::Display for GnValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GnValue::Bool(b) => write!(f, "{}", b),
      GnValue::Int(i) => write!(f, "{}", i),
      GnValue::Str(s) => {
        f.write_str("\"")?;
        for c in s.chars() {
          if matches!(c, '"' | '\\' | '$') {
            f.write_str("\\")?;
          }
          write!(f, "{}", c)?;
        }
        f.write_str("\"")
      }
    }
  }
}

/// A validated, ordered set of gn arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GnArgs(BTreeMap<String, GnValue>);

impl Hashable for GnArgs {}

impl GnArgs {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert an argument after checking it against the schema.
  pub fn set(&mut self, key: &str, value: GnValue) -> Result<(), GnArgsError> {
    let expected = kind_of(key).ok_or_else(|| GnArgsError::UnknownArg(key.to_string()))?;
    if value.kind() != expected {
      return Err(GnArgsError::WrongKind {
        key: key.to_string(),
        expected,
        found: value.kind(),
      });
    }
    self.0.insert(key.to_string(), value);
    Ok(())
  }

  /// Insert one of v8pack's own arguments. Keys must be in [`SCHEMA`].
  pub(crate) fn insert_known(&mut self, key: &'static str, value: GnValue) {
    debug_assert_eq!(kind_of(key), Some(value.kind()), "bad built-in gn arg {}", key);
    self.0.insert(key.to_string(), value);
  }

  /// Overlay `other` on top of `self`. Both sides were validated on the way in.
  pub(crate) fn overlay(&mut self, other: &GnArgs) {
    for (key, value) in &other.0 {
      self.0.insert(key.clone(), value.clone());
    }
  }

  pub fn get(&self, key: &str) -> Option<&GnValue> {
    self.0.get(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &GnValue)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Render as gn's `--args` value: space separated `key=value` pairs.
  pub fn to_flag_string(&self) -> String {
    self
      .0
      .iter()
      .map(|(key, value)| format!("{}={}", key, value))
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// The flag string escaped for use inside a double-quoted shell word.
  ///
  /// Only used when printing a command line a user can paste; invocations
  /// pass [`to_flag_string`](Self::to_flag_string) as a single argument.
  pub fn to_shell_escaped(&self) -> String {
    let mut escaped = String::new();
    for c in self.to_flag_string().chars() {
      if matches!(c, '"' | '\\' | '$' | '`') {
        escaped.push('\\');
      }
      escaped.push(c);
    }
    escaped
  }
}
