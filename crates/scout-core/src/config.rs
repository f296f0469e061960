//! Configuration management for Scout
//!
//! Project-level settings for the locator: per-candidate timing, the heuristic
//! fallback thresholds, diagnostics output and browser launch options.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, ScoutError};

/// Project-level Scout configuration
///
/// Loaded from `.scout/config.toml` in the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Candidate polling
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Heuristic fallback scans
    #[serde(default)]
    pub heuristics: HeuristicsConfig,

    /// Failure artifacts
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Browser launch options
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Blocking overlays to dismiss before interacting
    #[serde(default)]
    pub overlays: OverlayConfig,
}

/// Candidate polling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// How long each candidate is polled before moving on
    #[serde(default = "default_per_candidate_timeout_ms")]
    pub per_candidate_timeout_ms: u64,

    /// Sleep between probes of the same candidate
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Thresholds for the fallback scans.
///
/// The size limits are empirical; they are kept here rather than in code so a
/// project can tune them for its target sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicsConfig {
    /// Run the fallback scans when no candidate matched
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Elements scanned by the input heuristic
    #[serde(default = "default_input_selector")]
    pub input_selector: String,

    /// Keywords looked for in placeholder, aria-label and type
    #[serde(default = "default_search_keywords")]
    pub search_keywords: Vec<String>,

    /// Any visible input wider than this is accepted
    #[serde(default = "default_min_input_width")]
    pub min_input_width: f64,

    /// Elements scanned by the landmark heuristic
    #[serde(default = "default_region_selector")]
    pub region_selector: String,

    #[serde(default = "default_min_region_size")]
    pub min_region_width: f64,

    #[serde(default = "default_min_region_size")]
    pub min_region_height: f64,
}

/// Diagnostic bundle output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Directory bundles are written to
    #[serde(default = "default_diagnostics_dir")]
    pub dir: PathBuf,

    /// Capture a PNG screenshot with each bundle
    #[serde(default = "default_true")]
    pub screenshots: bool,
}

/// Configuration for browser launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Browser window width
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Browser window height
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// User agent string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Navigation timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Consent banner and overlay dismissal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Consent containers whose accept button is clicked first.
    /// Entries naming an `iframe` are searched inside the frame document.
    #[serde(default = "default_overlay_containers")]
    pub containers: Vec<String>,

    /// Button text (case-insensitive substring) that accepts a banner
    #[serde(default = "default_accept_labels")]
    pub accept_labels: Vec<String>,

    /// How long to wait for a clicked container to disappear
    #[serde(default = "default_container_wait_ms")]
    pub container_wait_ms: u64,

    /// Nodes removed outright when still present
    #[serde(default = "default_overlay_selectors")]
    pub selectors: Vec<String>,

    /// Also remove fixed/sticky/absolute elements near the top of the page.
    /// Aggressive: it can take site headers with it.
    #[serde(default)]
    pub sweep_top: bool,

    /// Height of the band swept when `sweep_top` is set
    #[serde(default = "default_top_band_px")]
    pub top_band_px: f64,
}

// Default value providers
fn default_true() -> bool {
    true
}

fn default_per_candidate_timeout_ms() -> u64 {
    7_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_input_selector() -> String {
    "input".to_string()
}

fn default_search_keywords() -> Vec<String> {
    vec!["search".to_string()]
}

fn default_min_input_width() -> f64 {
    100.0
}

fn default_region_selector() -> String {
    "nav, [role='navigation'], [role='menu'], [role='dialog']".to_string()
}

fn default_min_region_size() -> f64 {
    20.0
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from("target").join("diagnostics")
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_overlay_selectors() -> Vec<String> {
    vec![
        "div.ch2-container".to_string(),
        "#onetrust-consent-sdk".to_string(),
        "#onetrust-banner-sdk".to_string(),
        ".qc-cmp2-container".to_string(),
        "div.cc-window".to_string(),
        "div.cookie-consent".to_string(),
        "div.cookie-banner".to_string(),
    ]
}

fn default_overlay_containers() -> Vec<String> {
    vec![
        "div.ch2-container".to_string(),
        "#onetrust-consent-sdk".to_string(),
        "div.cc-window".to_string(),
        "iframe[src*='consent']".to_string(),
    ]
}

fn default_accept_labels() -> Vec<String> {
    ["accept", "aceitar", "allow", "ok", "got it"]
        .iter()
        .map(|label| label.to_string())
        .collect()
}

fn default_container_wait_ms() -> u64 {
    5_000
}

fn default_top_band_px() -> f64 {
    120.0
}

impl ScoutConfig {
    /// Load configuration from `.scout/config.toml` or use defaults
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let config_path = Self::path_in(project_root);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScoutError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.scout/config.toml`
    pub fn write_default(project_root: &Path) -> Result<PathBuf> {
        let config_dir = project_root.join(".scout");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = Self::path_in(project_root);
        std::fs::write(&config_path, Self::default().to_toml()?)?;
        Ok(config_path)
    }

    /// Render as the TOML a user would put in `.scout/config.toml`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ScoutError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Location of the config file under a project root
    pub fn path_in(project_root: &Path) -> PathBuf {
        project_root.join(".scout").join("config.toml")
    }
}

impl LocatorConfig {
    pub fn per_candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.per_candidate_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl DiagnosticsConfig {
    /// Bundle directory, with a relative `dir` taken from the project root
    pub fn dir_in(&self, project_root: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            project_root.join(&self.dir)
        }
    }
}

impl OverlayConfig {
    pub fn container_wait(&self) -> Duration {
        Duration::from_millis(self.container_wait_ms)
    }
}

impl BrowserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            per_candidate_timeout_ms: default_per_candidate_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input_selector: default_input_selector(),
            search_keywords: default_search_keywords(),
            min_input_width: default_min_input_width(),
            region_selector: default_region_selector(),
            min_region_width: default_min_region_size(),
            min_region_height: default_min_region_size(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            dir: default_diagnostics_dir(),
            screenshots: true,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            containers: default_overlay_containers(),
            accept_labels: default_accept_labels(),
            container_wait_ms: default_container_wait_ms(),
            selectors: default_overlay_selectors(),
            sweep_top: false,
            top_band_px: default_top_band_px(),
        }
    }
}
