//! Resilient element location for browser UI tests
//!
//! This crate finds elements on pages whose markup you do not control, using
//! Chrome DevTools Protocol (CDP) through `headless_chrome`.
//!
//! # Features
//!
//! - **Resilient Locator**: ordered candidate selectors with heuristic fallbacks
//! - **Diagnostic Bundles**: page source, screenshot and note on every failure
//! - **Interaction Helpers**: safe clicks with overlay recovery, consent dismissal, text/invisibility waits
//! - **Session Trait**: the locator takes any `&dyn Session`, not a global driver
//!
//! # Example
//!
//! ```no_run
//! use scout_browser::{safe_click, BrowserSession, Locator};
//! use scout_core::{ScoutConfig, Selector};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScoutConfig::load_or_default(Path::new("."))?;
//!     let session = BrowserSession::launch_with_config(config.browser.clone()).await?;
//!     session.navigate("https://the-internet.herokuapp.com/dynamic_loading/1").await?;
//!
//!     let locator = Locator::new(&config);
//!     let start = locator
//!         .find(&session, &[Selector::css("#start button"), Selector::text("Start")])
//!         .await?;
//!     safe_click(&session, &start).await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`session`]: the `Session` collaborator trait
//! - [`browser`]: Chrome-backed session and lifecycle
//! - [`locator`]: candidate polling and heuristic fallback chain
//! - [`diagnostics`]: failure artifact capture
//! - [`actions`]: interaction helpers
//! - [`error`]: error re-exports

pub mod actions;
pub mod browser;
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod session;

pub use actions::{
    dismiss_overlays, safe_click, safe_click_with_overlays, type_text, wait_for_text,
    wait_until_gone,
};
pub use browser::BrowserSession;
pub use diagnostics::{BundleTag, DiagnosticBundle, DiagnosticWriter};
pub use error::{Result, ScoutError, SessionError};
pub use locator::{find_first_visible, try_match, Locator, Strategy};
pub use session::{Session, SessionResult};
