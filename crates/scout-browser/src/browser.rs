//! Browser lifecycle management using Chrome DevTools Protocol

use crate::error::{Result, ScoutError};
use crate::session::{Session, SessionResult};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::DOM;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use scout_core::{BrowserConfig, ElementHandle, ElementState, Query, Selector, SessionError};
use std::ffi::OsStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads visibility, size, attributes and text of `this` in one round trip.
/// Returned as a JSON string so the value comes back by value.
const INSPECT_FN: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    const hidden = this.hidden === true
        || this.getAttribute('aria-hidden') === 'true'
        || style.display === 'none'
        || style.visibility === 'hidden'
        || parseFloat(style.opacity) === 0;
    const attributes = {};
    for (const attr of Array.from(this.attributes || [])) {
        attributes[attr.name] = attr.value;
    }
    const text = (this.innerText || this.textContent || '').trim().slice(0, 2000);
    return JSON.stringify({
        displayed: !hidden,
        width: rect.width,
        height: rect.height,
        attributes: attributes,
        text: text
    });
}"#;

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch a new browser instance
    ///
    /// # Example
    /// ```no_run
    /// use scout_browser::browser::BrowserSession;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::launch().await.unwrap();
    ///     session.navigate("https://the-internet.herokuapp.com/dynamic_loading/1").await.unwrap();
    /// }
    /// ```
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default()).await
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| ScoutError::Browser(format!("Failed to launch browser: {}", e)))?;

        let user_agent_arg: Option<String> =
            config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| ScoutError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScoutError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.timeout());

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Connect to an existing browser instance
    ///
    /// # Arguments
    /// * `port` - Chrome DevTools Protocol port (typically 9222)
    pub async fn connect(port: u16) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let browser = Browser::connect(format!("http://127.0.0.1:{}", port))
            .map_err(|e| ScoutError::Browser(format!("Failed to connect to browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScoutError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Connected to browser successfully");

        Ok(Self {
            browser,
            tab,
            config: BrowserConfig::default(),
        })
    }

    /// Navigate to a URL and wait for the load to finish
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| ScoutError::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| ScoutError::Browser(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    /// Execute JavaScript in the page context
    ///
    /// # Returns
    /// JSON result from JavaScript execution
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| ScoutError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Get the current page title
    pub async fn get_title(&self) -> Result<String> {
        let result = self.evaluate_script("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get the current URL
    pub async fn get_url(&self) -> Result<String> {
        let result = self.evaluate_script("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Launch configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Close the browser session
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        // Browser is dropped here and the Chrome process cleaned up
        Ok(())
    }

    /// Re-resolve a handle to a live element on the active tab.
    ///
    /// Handles carry the backend node id, which stays stable for the node's
    /// lifetime; frontend node ids are pushed fresh on every call.
    fn resolve(&self, handle: &ElementHandle) -> SessionResult<Element<'_>> {
        let backend_node_id: DOM::BackendNodeId = handle
            .id
            .parse()
            .map_err(|_| SessionError::StaleElement(format!("invalid handle {}", handle)))?;

        self.tab
            .get_document()
            .map_err(|e| classify_error("get document", &e.to_string()))?;

        let pushed = self
            .tab
            .call_method(DOM::PushNodesByBackendIdsToFrontend {
                backend_node_ids: vec![backend_node_id],
            })
            .map_err(|e| classify_error("resolve node", &e.to_string()))?;

        let node_id = match pushed.node_ids.first() {
            Some(id) if *id != 0 => *id,
            _ => return Err(SessionError::StaleElement(format!("{} is detached", handle))),
        };

        Element::new(&self.tab, node_id).map_err(|e| classify_error("resolve node", &e.to_string()))
    }
}

fn to_handle(element: &Element<'_>) -> ElementHandle {
    ElementHandle::new(element.backend_node_id.to_string(), element.tag_name.as_str())
}

/// Map a CDP error message onto the session error kinds.
///
/// headless_chrome surfaces errors as opaque messages; a lost tab or
/// connection must become `Unavailable` so the locator can stop early.
pub fn classify_error(operation: &str, message: &str) -> SessionError {
    let lower = message.to_lowercase();
    let detail = format!("{}: {}", operation, message);

    const UNAVAILABLE: [&str; 10] = [
        "closed tab",
        "connection is closed",
        "connection closed",
        "target closed",
        "window already closed",
        "no target with given id",
        "session with given id not found",
        "target crashed",
        "disconnected",
        "connection refused",
    ];
    const STALE: [&str; 4] = [
        "could not find node",
        "no node with given id",
        "cannot find context",
        "node with given id does not belong",
    ];

    if UNAVAILABLE.iter().any(|needle| lower.contains(needle)) {
        SessionError::Unavailable(detail)
    } else if lower.contains("no element found") || lower.contains("nodes were found") {
        SessionError::NotFound(detail)
    } else if STALE.iter().any(|needle| lower.contains(needle)) {
        SessionError::StaleElement(detail)
    } else {
        SessionError::Query(detail)
    }
}

#[async_trait]
impl Session for BrowserSession {
    async fn find_all(&self, selector: &Selector) -> SessionResult<Vec<ElementHandle>> {
        debug!("Querying {}", selector);

        let found = match selector.query() {
            Query::Css(css) => self.tab.find_elements(&css),
            Query::XPath(xpath) => self.tab.find_elements_by_xpath(&xpath),
        };

        match found {
            Ok(elements) => Ok(elements.iter().map(to_handle).collect()),
            Err(e) => match classify_error("find elements", &e.to_string()) {
                SessionError::NotFound(_) => Ok(Vec::new()),
                other => Err(other),
            },
        }
    }

    async fn inspect(&self, element: &ElementHandle) -> SessionResult<ElementState> {
        let live = self.resolve(element)?;
        let result = live
            .call_js_fn(INSPECT_FN, vec![], false)
            .map_err(|e| classify_error("inspect element", &e.to_string()))?;

        let raw = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| SessionError::Query(format!("no state returned for {}", element)))?;

        serde_json::from_str(raw)
            .map_err(|e| SessionError::Query(format!("bad state for {}: {}", element, e)))
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.tab
            .get_content()
            .map_err(|e| classify_error("get page source", &e.to_string()))
    }

    async fn screenshot(&self) -> SessionResult<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| classify_error("capture screenshot", &e.to_string()))
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        let live = self.resolve(element)?;
        live.click()
            .map_err(|e| classify_error("click", &e.to_string()))?;
        Ok(())
    }

    async fn call_on(
        &self,
        element: &ElementHandle,
        function_declaration: &str,
    ) -> SessionResult<serde_json::Value> {
        let live = self.resolve(element)?;
        let result = live
            .call_js_fn(function_declaration, vec![], false)
            .map_err(|e| classify_error("call function", &e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    async fn type_into(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        let live = self.resolve(element)?;
        live.type_into(text)
            .map_err(|e| classify_error("type text", &e.to_string()))?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> SessionResult<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| classify_error("evaluate script", &e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 1080);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_classify_closed_tab() {
        let err = classify_error("find elements", "Unable to make method calls on a closed tab");
        assert!(err.is_unavailable());

        let err = classify_error("inspect element", "No target with given id found");
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_classify_lost_connection() {
        let err = classify_error(
            "evaluate script",
            "Unable to make method calls because underlying connection is closed",
        );
        assert!(err.is_unavailable());

        let err = classify_error("find elements", "Target closed");
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_classify_closed_shadow_root_is_not_session_loss() {
        let err = classify_error("find elements", "Cannot query into a closed shadow root");
        assert!(!err.is_unavailable());
        assert!(matches!(err, SessionError::Query(_)));
    }

    #[test]
    fn test_classify_no_element() {
        let err = classify_error("find elements", "No element found");
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_classify_stale_node() {
        let err = classify_error("resolve node", "Could not find node with given id");
        assert!(matches!(err, SessionError::StaleElement(_)));
    }

    #[test]
    fn test_classify_other_is_query() {
        let err = classify_error("find elements", "DOM Error while querying");
        assert!(matches!(err, SessionError::Query(_)));
        assert!(err.to_string().contains("find elements"));
    }
}
