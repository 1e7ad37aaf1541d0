//! Error and diagnostic types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw diagnostic reported by the warehouse for a failed statement.
///
/// The message is carried verbatim and never reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Vendor error code (e.g. "002003")
    pub code: Option<String>,
    /// ANSI SQL state (e.g. "42S02")
    pub sql_state: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            sql_state: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.sql_state) {
            (Some(code), Some(state)) => write!(f, "{} ({}): {}", code, state, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Failure reported by a Catalog or Executor capability
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecError {
    /// The statement itself was rejected (syntax, missing object, permissions)
    #[error("{0}")]
    Statement(Diagnostic),
    /// The connection is unusable; fatal for the current file
    #[error("connection failure: {0}")]
    Connection(String),
}

impl ExecError {
    pub fn statement(message: impl Into<String>) -> Self {
        ExecError::Statement(Diagnostic::new(message))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, ExecError::Connection(_))
    }
}

/// Terminal failure of a single file's validation run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("connection failure at statement {statement}: {message}")]
    Connection { statement: usize, message: String },
}
