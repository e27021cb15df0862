//! Drift detection: does a running container still match its declaration?
//!
//! Every detector is a pure function of the declared resource, inputs the
//! caller already read from disk, and a freshly inspected container. They
//! never fail and never touch the runtime.

pub mod custom;
pub mod database;
pub mod infra;
pub mod mount;
pub mod site;

use std::fmt;

/// Outcome of comparing a declaration with its runtime counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    Match,
    /// First difference found
    Mismatch(String),
}

impl Drift {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Match => None,
            Self::Mismatch(reason) => Some(reason),
        }
    }
}

impl From<Result<(), String>> for Drift {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::Match,
            Err(reason) => Self::Mismatch(reason),
        }
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("match"),
            Self::Mismatch(reason) => f.write_str(reason),
        }
    }
}

/// Compare one observed value with the expected one.
fn ensure_eq(what: &str, actual: &str, expected: &str) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{what} is '{actual}', want '{expected}'"))
    }
}

/// Compare a label, treating a missing label as empty.
fn ensure_label(
    container: &dockerkit::RuntimeContainer,
    key: &str,
    expected: &str,
) -> Result<(), String> {
    let what = format!("label {}", key.trim_start_matches(crate::identity::PREFIX));
    ensure_eq(&what, container.label(key).unwrap_or_default(), expected)
}
