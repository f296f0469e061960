//! Resilient element location
//!
//! Target pages are third-party demos whose markup shifts between runs, so a
//! single hard-coded selector is brittle. The locator walks a prioritized
//! chain of strategies and returns the first visible element any of them
//! produces:
//!
//! 1. every explicit candidate selector, in order, each polled for its own
//!    timeout window;
//! 2. a scan of input controls that look like a search box;
//! 3. a scan of navigation/menu/dialog landmarks of non-trivial size.
//!
//! The fallbacks trade precision for resilience; a false positive is the
//! accepted cost. When nothing matches, or the session disappears, a
//! diagnostic bundle is written and a typed error returned. The whole chain
//! is never retried here; that decision belongs to the caller.

use crate::diagnostics::{BundleTag, DiagnosticWriter};
use crate::error::{Result, ScoutError, SessionError};
use crate::session::{Session, SessionResult};
use async_trait::async_trait;
use scout_core::{ElementHandle, ElementState, HeuristicsConfig, LocatorConfig, ScoutConfig, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One link in the fallback chain.
///
/// `Ok(None)` means "nothing usable here"; `Err` is reserved for a lost
/// session and stops the chain.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    async fn attempt(&self, session: &dyn Session) -> SessionResult<Option<ElementHandle>>;
}

/// Keep session loss as an error, turn every other failure into "no match"
fn absorb<T>(result: SessionResult<T>) -> SessionResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ SessionError::Unavailable(_)) => Err(e),
        Err(e) => {
            debug!("Probe failed, treating as no match: {}", e);
            Ok(None)
        }
    }
}

/// Probe once, without waiting: the first element matching `selector` that is
/// visible right now.
pub async fn try_match(
    session: &dyn Session,
    selector: &Selector,
) -> SessionResult<Option<ElementHandle>> {
    scan(session, selector, ElementState::is_visible).await
}

/// Poll one explicit selector until a visible match appears or the window ends
pub struct ExplicitCandidate {
    pub selector: Selector,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[async_trait]
impl Strategy for ExplicitCandidate {
    fn describe(&self) -> String {
        self.selector.to_string()
    }

    async fn attempt(&self, session: &dyn Session) -> SessionResult<Option<ElementHandle>> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(element) = try_match(session, &self.selector).await? {
                return Ok(Some(element));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Visible input whose placeholder, aria-label or type mentions a keyword, or
/// which is wide enough to pass for the page's primary input
pub struct SearchLikeInput {
    pub selector: Selector,
    pub keywords: Vec<String>,
    pub min_width: f64,
}

impl SearchLikeInput {
    pub fn from_config(config: &HeuristicsConfig) -> Self {
        Self {
            selector: Selector::css(config.input_selector.clone()),
            keywords: config.search_keywords.iter().map(|k| k.to_lowercase()).collect(),
            min_width: config.min_input_width,
        }
    }

    pub fn accepts(&self, state: &ElementState) -> bool {
        if !state.is_visible() {
            return false;
        }

        let mentions_keyword = ["placeholder", "aria-label", "type"].iter().any(|attr| {
            state
                .attribute(attr)
                .map(|value| {
                    let value = value.to_lowercase();
                    self.keywords.iter().any(|k| value.contains(k.as_str()))
                })
                .unwrap_or(false)
        });

        mentions_keyword || state.width > self.min_width
    }
}

#[async_trait]
impl Strategy for SearchLikeInput {
    fn describe(&self) -> String {
        format!("search-like input ({})", self.selector)
    }

    async fn attempt(&self, session: &dyn Session) -> SessionResult<Option<ElementHandle>> {
        scan(session, &self.selector, |state| self.accepts(state)).await
    }
}

/// Visible navigation, menu or dialog landmark above a minimum size
pub struct LandmarkRegion {
    pub selector: Selector,
    pub min_width: f64,
    pub min_height: f64,
}

impl LandmarkRegion {
    pub fn from_config(config: &HeuristicsConfig) -> Self {
        Self {
            selector: Selector::css(config.region_selector.clone()),
            min_width: config.min_region_width,
            min_height: config.min_region_height,
        }
    }

    pub fn accepts(&self, state: &ElementState) -> bool {
        state.is_visible() && state.height > self.min_height && state.width > self.min_width
    }
}

#[async_trait]
impl Strategy for LandmarkRegion {
    fn describe(&self) -> String {
        format!("landmark region ({})", self.selector)
    }

    async fn attempt(&self, session: &dyn Session) -> SessionResult<Option<ElementHandle>> {
        scan(session, &self.selector, |state| self.accepts(state)).await
    }
}

/// Single pass over every element matching `selector`; first accepted wins
async fn scan<F>(
    session: &dyn Session,
    selector: &Selector,
    accepts: F,
) -> SessionResult<Option<ElementHandle>>
where
    F: Fn(&ElementState) -> bool + Send + Sync,
{
    let Some(elements) = absorb(session.find_all(selector).await)? else {
        return Ok(None);
    };

    for element in elements {
        if let Some(state) = absorb(session.inspect(&element).await)? {
            if accepts(&state) {
                return Ok(Some(element));
            }
        }
    }

    Ok(None)
}

/// Resolves candidate selector lists to a single visible element
#[derive(Debug, Clone)]
pub struct Locator {
    config: LocatorConfig,
    heuristics: HeuristicsConfig,
    diagnostics: Option<DiagnosticWriter>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(&ScoutConfig::default())
    }
}

impl Locator {
    pub fn new(config: &ScoutConfig) -> Self {
        Self {
            config: config.locator.clone(),
            heuristics: config.heuristics.clone(),
            diagnostics: Some(DiagnosticWriter::from_config(&config.diagnostics)),
        }
    }

    pub fn with_diagnostics(mut self, writer: DiagnosticWriter) -> Self {
        self.diagnostics = Some(writer);
        self
    }

    pub fn without_diagnostics(mut self) -> Self {
        self.diagnostics = None;
        self
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicsConfig) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    /// The full chain for a candidate list: explicit candidates, then the
    /// heuristic fallbacks when enabled
    pub fn strategies(
        &self,
        candidates: &[Selector],
        per_candidate_timeout: Duration,
    ) -> Vec<Box<dyn Strategy>> {
        let mut chain: Vec<Box<dyn Strategy>> = candidates
            .iter()
            .map(|selector| {
                Box::new(ExplicitCandidate {
                    selector: selector.clone(),
                    timeout: per_candidate_timeout,
                    poll_interval: self.config.poll_interval(),
                }) as Box<dyn Strategy>
            })
            .collect();

        if self.heuristics.enabled {
            chain.push(Box::new(SearchLikeInput::from_config(&self.heuristics)));
            chain.push(Box::new(LandmarkRegion::from_config(&self.heuristics)));
        }

        chain
    }

    /// Locate with the configured per-candidate timeout
    pub async fn find(&self, session: &dyn Session, candidates: &[Selector]) -> Result<ElementHandle> {
        self.find_first_visible(session, candidates, self.config.per_candidate_timeout())
            .await
    }

    /// Return the first element that becomes visible.
    ///
    /// Candidates are tried in order, each polled for `per_candidate_timeout`;
    /// the heuristic scans run only after every candidate is exhausted.
    ///
    /// # Errors
    /// - [`ScoutError::NotFound`] when nothing matched
    /// - [`ScoutError::SessionUnavailable`] when the session was lost
    ///
    /// # Example
    /// ```no_run
    /// use scout_browser::{BrowserSession, Locator};
    /// use scout_core::Selector;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::launch().await.unwrap();
    ///     session.navigate("https://www.jetbrains.com/").await.unwrap();
    ///
    ///     let search = Locator::default()
    ///         .find_first_visible(
    ///             &session,
    ///             &[
    ///                 Selector::css("[data-test='search-input']"),
    ///                 Selector::css("input[type='search']"),
    ///             ],
    ///             Duration::from_secs(7),
    ///         )
    ///         .await
    ///         .unwrap();
    ///     println!("Found {}", search);
    /// }
    /// ```
    pub async fn find_first_visible(
        &self,
        session: &dyn Session,
        candidates: &[Selector],
        per_candidate_timeout: Duration,
    ) -> Result<ElementHandle> {
        let explicit = candidates.len();

        for (index, strategy) in self
            .strategies(candidates, per_candidate_timeout)
            .into_iter()
            .enumerate()
        {
            debug!("Trying {}", strategy.describe());

            match strategy.attempt(session).await {
                Ok(Some(element)) => {
                    if index < explicit {
                        info!("Found element using: {}", strategy.describe());
                    } else {
                        warn!("Fallback: using {} for {}", element, strategy.describe());
                    }
                    return Ok(element);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Browser session lost while trying {}: {}", strategy.describe(), e);
                    let diagnostics = self.capture(session, BundleTag::SessionLost).await;
                    return Err(ScoutError::SessionUnavailable {
                        reason: e.to_string(),
                        candidates: candidates.to_vec(),
                        diagnostics,
                    });
                }
            }
        }

        let diagnostics = self.capture(session, BundleTag::NoMatch).await;
        Err(ScoutError::NotFound {
            candidates: candidates.to_vec(),
            diagnostics,
        })
    }

    async fn capture(&self, session: &dyn Session, tag: BundleTag) -> Option<std::path::PathBuf> {
        let writer = self.diagnostics.as_ref()?;
        writer.capture(session, tag).await.map(|bundle| bundle.note)
    }
}

/// Locate with default configuration and diagnostics under `target/diagnostics`
pub async fn find_first_visible(
    session: &dyn Session,
    candidates: &[Selector],
    per_candidate_timeout: Duration,
) -> Result<ElementHandle> {
    Locator::default()
        .find_first_visible(session, candidates, per_candidate_timeout)
        .await
}
