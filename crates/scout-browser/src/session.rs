//! The browser session collaborator
//!
//! The locator never owns a browser. Callers pass a `&dyn Session` in; the
//! Chrome-backed [`BrowserSession`](crate::browser::BrowserSession) is one
//! implementation, tests use an in-memory one.

use async_trait::async_trait;
use scout_core::{ElementHandle, ElementState, Selector, SessionError};

/// Result of a session call
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Live browser automation connection.
///
/// Implementations report a lost browser (closed window, dropped connection)
/// as [`SessionError::Unavailable`]. A selector that matches nothing is
/// `Ok(vec![])`, not an error.
#[async_trait]
pub trait Session: Send + Sync {
    /// All elements currently matching `selector`, in document order
    async fn find_all(&self, selector: &Selector) -> SessionResult<Vec<ElementHandle>>;

    /// Read the rendered state of an element
    async fn inspect(&self, element: &ElementHandle) -> SessionResult<ElementState>;

    /// Raw markup of the current document
    async fn page_source(&self) -> SessionResult<String>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> SessionResult<Vec<u8>>;

    /// Native click on the element
    async fn click(&self, element: &ElementHandle) -> SessionResult<()>;

    /// Call a JavaScript function with `this` bound to the element.
    ///
    /// `function_declaration` is a full function expression, e.g.
    /// `function() { this.click(); }`.
    async fn call_on(
        &self,
        element: &ElementHandle,
        function_declaration: &str,
    ) -> SessionResult<serde_json::Value>;

    /// Focus the element and type text into it
    async fn type_into(&self, element: &ElementHandle, text: &str) -> SessionResult<()>;

    /// Evaluate a script in the page context
    async fn execute_script(&self, script: &str) -> SessionResult<serde_json::Value>;
}
