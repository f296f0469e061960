//! # scout-core
//!
//! Core types for Scout, a resilient element locator for browser UI tests.
//!
//! ## Core Paradigm
//!
//! - A candidate list is an ordered `Vec<Selector>`; the first visible match wins
//! - Element handles belong to the browser session, never to the locator
//! - Failures are typed: nothing matched vs. the session went away
//! - Diagnostics are best-effort and never mask the original failure

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{
    BrowserConfig, DiagnosticsConfig, HeuristicsConfig, LocatorConfig, OverlayConfig,
    ScoutConfig,
};
pub use error::{Result, ScoutError, SessionError};
pub use types::*;
