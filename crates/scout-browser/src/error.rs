//! Browser error types - re-exports the unified ScoutError from scout-core
//!
//! - Browser(String) - launch, navigation and CDP failures
//! - NotFound / SessionUnavailable - the two terminal locate failures
//! - SessionError - per-call failures reported by a `Session`

pub use scout_core::{Result, ScoutError, SessionError};
