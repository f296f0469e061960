//! Unified error types for Scout

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Selector;

/// Unified error type for all Scout operations
#[derive(Error, Debug)]
pub enum ScoutError {
    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    // Locator errors
    #[error(
        "None of the candidate selectors matched: {}{}",
        Selector::display_list(.candidates),
        diagnostics_hint(.diagnostics)
    )]
    NotFound {
        candidates: Vec<Selector>,
        diagnostics: Option<PathBuf>,
    },

    #[error(
        "Browser session unavailable while locating {}: {reason}{}",
        Selector::display_list(.candidates),
        diagnostics_hint(.diagnostics)
    )]
    SessionUnavailable {
        reason: String,
        candidates: Vec<Selector>,
        diagnostics: Option<PathBuf>,
    },

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl ScoutError {
    /// True for the terminal "session went away" failure
    pub fn is_session_unavailable(&self) -> bool {
        matches!(self, ScoutError::SessionUnavailable { .. })
    }

    /// True when no candidate or heuristic matched
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScoutError::NotFound { .. })
    }

    /// Diagnostics bundle note written for this failure, if any
    pub fn diagnostics(&self) -> Option<&PathBuf> {
        match self {
            ScoutError::NotFound { diagnostics, .. }
            | ScoutError::SessionUnavailable { diagnostics, .. } => diagnostics.as_ref(),
            _ => None,
        }
    }
}

fn diagnostics_hint(diagnostics: &Option<PathBuf>) -> String {
    match diagnostics {
        Some(path) => format!(". See {} for page source/screenshot.", path.display()),
        None => String::new(),
    }
}

/// Failure reported by a browser session collaborator.
///
/// Only `Unavailable` is terminal for a locate; the other variants mean the
/// probe found nothing usable and the caller may move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session unavailable: {0}")]
    Unavailable(String),

    #[error("stale element: {0}")]
    StaleElement(String),

    #[error("no such element: {0}")]
    NotFound(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl SessionError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SessionError::Unavailable(_))
    }
}

impl From<SessionError> for ScoutError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unavailable(reason) => ScoutError::SessionUnavailable {
                reason,
                candidates: Vec::new(),
                diagnostics: None,
            },
            other => ScoutError::Browser(other.to_string()),
        }
    }
}

/// Result type alias using ScoutError
pub type Result<T> = std::result::Result<T, ScoutError>;
