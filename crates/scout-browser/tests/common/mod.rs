//! In-memory session used by the integration tests.
//!
//! Nodes are matched by selector equality rather than real CSS/XPath
//! evaluation; what matters here is the locator's decision-making.

#![allow(dead_code)]

use async_trait::async_trait;
use scout_browser::{Session, SessionResult};
use scout_core::{ElementHandle, ElementState, Selector, SessionError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub id: String,
    pub tag: String,
    pub selectors: Vec<Selector>,
    pub state: ElementState,
    /// Number of inspections that report the node as hidden before it shows up
    pub hidden_for: usize,
}

impl FakeNode {
    pub fn new(id: &str, tag: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            selectors: Vec::new(),
            state: ElementState {
                displayed: true,
                width: 60.0,
                height: 20.0,
                attributes: BTreeMap::new(),
                text: String::new(),
            },
            hidden_for: 0,
        }
    }

    pub fn matching(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.state.width = width;
        self.state.height = height;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.state.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.state.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.state.displayed = false;
        self
    }

    pub fn appears_after(mut self, inspections: usize) -> Self {
        self.hidden_for = inspections;
        self
    }

    pub fn handle(&self) -> ElementHandle {
        ElementHandle::new(self.id.clone(), self.tag.clone())
    }
}

pub struct FakeSession {
    page: String,
    nodes: Mutex<Vec<FakeNode>>,
    inspections: Mutex<BTreeMap<String, usize>>,
    closed: AtomicBool,
    /// Close the session once this many `find_all` calls have been made
    close_after_queries: Option<usize>,
    queries: Mutex<Vec<Selector>>,
    query_count: AtomicUsize,
    pub screenshot_fails: bool,
    pub click_fails: bool,
    /// Native clicks are intercepted until some script has run in the page
    pub blocked_by_overlay: bool,
    pub call_fails: bool,
    /// Every `find_all` fails like a malformed selector would
    pub query_fails: bool,
    pub clicks: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<(String, String)>>,
    pub scripts: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub script_result: serde_json::Value,
}

impl FakeSession {
    pub fn new(page: &str) -> Self {
        Self {
            page: page.to_string(),
            nodes: Mutex::new(Vec::new()),
            inspections: Mutex::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
            close_after_queries: None,
            queries: Mutex::new(Vec::new()),
            query_count: AtomicUsize::new(0),
            screenshot_fails: false,
            click_fails: false,
            blocked_by_overlay: false,
            call_fails: false,
            query_fails: false,
            clicks: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            script_result: serde_json::Value::Null,
        }
    }

    pub fn with_node(self, node: FakeNode) -> Self {
        self.nodes.lock().unwrap().push(node);
        self
    }

    pub fn closing_after(mut self, queries: usize) -> Self {
        self.close_after_queries = Some(queries);
        self
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Hide or remove a node mid-test
    pub fn set_displayed(&self, id: &str, displayed: bool) {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(node) = nodes.iter_mut().find(|n| n.id == id) {
            node.state.displayed = displayed;
        }
    }

    pub fn queried(&self) -> Vec<Selector> {
        self.queries.lock().unwrap().clone()
    }

    fn check_open(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SessionError::Unavailable("no such window: target window already closed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn find_all(&self, selector: &Selector) -> SessionResult<Vec<ElementHandle>> {
        let made = self.query_count.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.close_after_queries {
            if made >= limit {
                self.close();
            }
        }
        self.check_open()?;
        if self.query_fails {
            return Err(SessionError::Query("DOM Error while querying".to_string()));
        }

        self.queries.lock().unwrap().push(selector.clone());
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.selectors.contains(selector))
            .map(FakeNode::handle)
            .collect())
    }

    async fn inspect(&self, element: &ElementHandle) -> SessionResult<ElementState> {
        self.check_open()?;

        let nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter()
            .find(|n| n.id == element.id)
            .ok_or_else(|| SessionError::StaleElement(element.id.clone()))?;

        let mut inspections = self.inspections.lock().unwrap();
        let seen = inspections.entry(node.id.clone()).or_insert(0);
        *seen += 1;

        let mut state = node.state.clone();
        if *seen <= node.hidden_for {
            state.displayed = false;
        }
        Ok(state)
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.check_open()?;
        Ok(self.page.clone())
    }

    async fn screenshot(&self) -> SessionResult<Vec<u8>> {
        self.check_open()?;
        if self.screenshot_fails {
            return Err(SessionError::Query("screenshot not supported".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        self.check_open()?;
        let overlay_present = self.blocked_by_overlay && self.scripts.lock().unwrap().is_empty();
        if self.click_fails || overlay_present {
            return Err(SessionError::Query(
                "element click intercepted: other element would receive the click".to_string(),
            ));
        }
        self.clicks.lock().unwrap().push(element.id.clone());
        Ok(())
    }

    async fn call_on(
        &self,
        element: &ElementHandle,
        function_declaration: &str,
    ) -> SessionResult<serde_json::Value> {
        self.check_open()?;
        if self.call_fails {
            return Err(SessionError::Query("script click was swallowed".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((element.id.clone(), function_declaration.to_string()));
        Ok(serde_json::Value::Bool(true))
    }

    async fn type_into(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        self.check_open()?;
        self.typed
            .lock()
            .unwrap()
            .push((element.id.clone(), text.to_string()));
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> SessionResult<serde_json::Value> {
        self.check_open()?;
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(self.script_result.clone())
    }
}
