//! Diagnostic bundles - failure artifacts for post-mortem debugging
//!
//! When a locate fails, the current page markup, a screenshot and a short
//! note are written side by side under the diagnostics directory:
//!
//! ```text
//! target/diagnostics/
//!   no-match-20261017T101500.123Z.html
//!   no-match-20261017T101500.123Z.png
//!   no-match-20261017T101500.123Z.txt
//! ```
//!
//! Capture is fail-open: any I/O or session error is logged and swallowed so
//! it can never replace the failure being diagnosed.

use crate::error::Result;
use crate::session::Session;
use chrono::{DateTime, NaiveDateTime, Utc};
use scout_core::fail_open::fail_open;
use scout_core::DiagnosticsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Why a bundle was captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleTag {
    /// No candidate or heuristic matched
    NoMatch,
    /// The browser session went away mid-search
    SessionLost,
    /// Caller-supplied tag
    Custom(String),
}

impl std::fmt::Display for BundleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleTag::NoMatch => write!(f, "no-match"),
            BundleTag::SessionLost => write!(f, "session-lost"),
            BundleTag::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for BundleTag {
    fn from(tag: &str) -> Self {
        match tag {
            "no-match" => BundleTag::NoMatch,
            "session-lost" => BundleTag::SessionLost,
            other => BundleTag::Custom(other.to_string()),
        }
    }
}

/// A persisted set of failure artifacts. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticBundle {
    pub tag: BundleTag,
    pub created_at: DateTime<Utc>,
    /// Raw page markup, absent when the session could not produce it
    pub page_source: Option<PathBuf>,
    /// PNG screenshot, absent when disabled or capture failed
    pub screenshot: Option<PathBuf>,
    /// Human-readable note describing what was captured
    pub note: PathBuf,
}

/// Writes diagnostic bundles to a directory
#[derive(Debug, Clone)]
pub struct DiagnosticWriter {
    dir: PathBuf,
    screenshots: bool,
}

impl DiagnosticWriter {
    /// Create a writer for `dir` with screenshots enabled
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            screenshots: true,
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            screenshots: config.screenshots,
        }
    }

    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots = enabled;
        self
    }

    /// Directory bundles are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture a bundle for the session's current page.
    ///
    /// Returns `None` when nothing could be written; never fails.
    pub async fn capture(&self, session: &dyn Session, tag: BundleTag) -> Option<DiagnosticBundle> {
        fail_open("diagnostics capture", || self.try_capture(session, tag)).await
    }

    async fn try_capture(&self, session: &dyn Session, tag: BundleTag) -> Result<DiagnosticBundle> {
        fs::create_dir_all(&self.dir).await?;

        let created_at = Utc::now();
        let stem = self.unique_stem(&tag, created_at).await;
        let note_path = self.dir.join(format!("{}.txt", stem));
        let mut note = String::new();

        let page = match session.page_source().await {
            Ok(page) => page,
            Err(e) => {
                debug!("Diagnostics: browser not available to get page source: {}", e);
                note.push_str(&format!("Could not get page source: {}\n", e));
                fs::write(&note_path, note).await?;
                info!("Diagnostics note written to: {}", note_path.display());
                return Ok(DiagnosticBundle {
                    tag,
                    created_at,
                    page_source: None,
                    screenshot: None,
                    note: note_path,
                });
            }
        };

        let html_path = self.dir.join(format!("{}.html", stem));
        let page_source = match fs::write(&html_path, page).await {
            Ok(()) => Some(html_path),
            Err(e) => {
                note.push_str(&format!("Failed to write page source: {}\n", e));
                None
            }
        };

        let screenshot = if self.screenshots {
            self.write_screenshot(session, &stem, &mut note).await
        } else {
            None
        };

        note.push_str(&format!(
            "Diagnostics generated: {}{}\n",
            page_source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "no html".to_string()),
            if screenshot.is_some() { ", png created" } else { ", no png" }
        ));
        fs::write(&note_path, note).await?;

        info!("Diagnostics written to: {}", self.dir.display());

        Ok(DiagnosticBundle {
            tag,
            created_at,
            page_source,
            screenshot,
            note: note_path,
        })
    }

    async fn write_screenshot(
        &self,
        session: &dyn Session,
        stem: &str,
        note: &mut String,
    ) -> Option<PathBuf> {
        let data = match session.screenshot().await {
            Ok(data) => data,
            Err(e) => {
                note.push_str(&format!("Screenshot failed: {}\n", e));
                return None;
            }
        };

        let png_path = self.dir.join(format!("{}.png", stem));
        match fs::write(&png_path, data).await {
            Ok(()) => Some(png_path),
            Err(e) => {
                note.push_str(&format!("Screenshot failed: {}\n", e));
                None
            }
        }
    }

    /// `{tag}-{timestamp}`, with `-N` appended if that stem is taken
    async fn unique_stem(&self, tag: &BundleTag, created_at: DateTime<Utc>) -> String {
        let base = format!("{}-{}", tag, created_at.format(TIMESTAMP_FORMAT));
        let mut stem = base.clone();
        let mut suffix = 1;
        while fs::try_exists(self.dir.join(format!("{}.txt", stem)))
            .await
            .unwrap_or(false)
        {
            stem = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        stem
    }

    /// All bundles in the directory, newest first
    pub async fn list(&self) -> Result<Vec<DiagnosticBundle>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut bundles = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((tag, created_at)) = parse_stem(stem) else {
                continue;
            };

            let html = self.dir.join(format!("{}.html", stem));
            let png = self.dir.join(format!("{}.png", stem));
            bundles.push(DiagnosticBundle {
                tag,
                created_at,
                page_source: html.exists().then_some(html),
                screenshot: png.exists().then_some(png),
                note: path,
            });
        }

        bundles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.note.cmp(&a.note)));
        Ok(bundles)
    }
}

/// Split `{tag}-{timestamp}[-N]` back into its tag and timestamp
fn parse_stem(stem: &str) -> Option<(BundleTag, DateTime<Utc>)> {
    let parts: Vec<&str> = stem.split('-').collect();
    (1..parts.len()).rev().find_map(|i| {
        NaiveDateTime::parse_from_str(parts[i], TIMESTAMP_FORMAT)
            .ok()
            .map(|ts| (BundleTag::from(parts[..i].join("-").as_str()), ts.and_utc()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_tag_display() {
        assert_eq!(BundleTag::NoMatch.to_string(), "no-match");
        assert_eq!(BundleTag::SessionLost.to_string(), "session-lost");
        assert_eq!(BundleTag::Custom("search-timeout".to_string()).to_string(), "search-timeout");
    }

    #[test]
    fn test_bundle_tag_from_str() {
        assert_eq!(BundleTag::from("no-match"), BundleTag::NoMatch);
        assert_eq!(BundleTag::from("session-lost"), BundleTag::SessionLost);
        assert_eq!(BundleTag::from("menu"), BundleTag::Custom("menu".to_string()));
    }

    #[test]
    fn test_parse_stem() {
        let (tag, ts) = parse_stem("no-match-20261017T101500.123Z").unwrap();
        assert_eq!(tag, BundleTag::NoMatch);
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "20261017T101500.123Z");

        let (tag, _) = parse_stem("session-lost-20261017T101500.123Z-2").unwrap();
        assert_eq!(tag, BundleTag::SessionLost);

        assert!(parse_stem("notes").is_none());
    }

    #[test]
    fn test_writer_from_config() {
        let config = DiagnosticsConfig {
            dir: PathBuf::from("out/diag"),
            screenshots: false,
        };
        let writer = DiagnosticWriter::from_config(&config);
        assert_eq!(writer.dir(), Path::new("out/diag"));
        assert!(!writer.screenshots);
    }
}
