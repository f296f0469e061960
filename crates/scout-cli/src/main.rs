//! Scout CLI - locate elements on live pages
//!
//! Usage:
//!   scout locate <url> -s <selector>...   Find the first visible candidate
//!   scout dump <url>                       Write a diagnostic bundle for a page
//!   scout diagnostics                      List captured bundles
//!   scout config init|show                 Write or print the configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scout_browser::{dismiss_overlays, BrowserSession, BundleTag, DiagnosticWriter, Locator, Session};
use scout_core::{ScoutConfig, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about = "Resilient element location for browser UI tests")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding .scout/config.toml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the first visible element among candidate selectors
    Locate {
        /// Page to open
        url: String,

        /// Candidate selector in priority order (css:, xpath:, id:, tag:, link:, text:; bare values are CSS)
        #[arg(short, long = "selector", value_name = "SELECTOR")]
        selectors: Vec<Selector>,

        /// Per-candidate timeout in milliseconds (defaults to config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Skip the heuristic fallback scans
        #[arg(long)]
        no_heuristics: bool,

        /// Remove configured consent/chat overlays before locating
        #[arg(long)]
        dismiss_overlays: bool,
    },

    /// Capture a diagnostic bundle for a page
    Dump {
        /// Page to open
        url: String,

        /// Bundle tag
        #[arg(long, default_value = "manual")]
        tag: String,

        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },

    /// List captured diagnostic bundles, newest first
    Diagnostics,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration file
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = ScoutConfig::load_or_default(&cli.root)
        .with_context(|| format!("Failed to load config under {}", cli.root.display()))?;
    if !matches!(cli.command, Commands::Config { .. }) {
        config.diagnostics.dir = config.diagnostics.dir_in(&cli.root);
    }

    match cli.command {
        Commands::Locate {
            url,
            selectors,
            timeout_ms,
            headful,
            no_heuristics,
            dismiss_overlays,
        } => {
            cmd_locate(config, url, selectors, timeout_ms, headful, no_heuristics, dismiss_overlays)
                .await
        }
        Commands::Dump { url, tag, headful } => cmd_dump(config, url, tag, headful).await,
        Commands::Diagnostics => cmd_diagnostics(config).await,
        Commands::Config { action } => cmd_config(&cli.root, config, action),
    }
}

async fn open(config: &ScoutConfig, url: &str, headful: bool) -> Result<BrowserSession> {
    let mut browser_config = config.browser.clone();
    if headful {
        browser_config.headless = false;
    }

    let session = BrowserSession::launch_with_config(browser_config)
        .await
        .context("Failed to launch browser")?;
    session
        .navigate(url)
        .await
        .with_context(|| format!("Failed to open {}", url))?;
    Ok(session)
}

async fn cmd_locate(
    mut config: ScoutConfig,
    url: String,
    selectors: Vec<Selector>,
    timeout_ms: Option<u64>,
    headful: bool,
    no_heuristics: bool,
    dismiss: bool,
) -> Result<()> {
    if no_heuristics {
        config.heuristics.enabled = false;
    }
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.locator.per_candidate_timeout());

    let session = open(&config, &url, headful).await?;

    if dismiss {
        dismiss_overlays(&session, &config.overlays).await;
    }

    info!(
        "Locating {} on {}",
        Selector::display_list(&selectors),
        url
    );

    let element = Locator::new(&config)
        .find_first_visible(&session, &selectors, timeout)
        .await?;
    let state = session
        .inspect(&element)
        .await
        .context("Failed to read element state")?;

    let report = serde_json::json!({
        "url": session.get_url().await.unwrap_or_default(),
        "element": element,
        "state": state,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    session.close().await?;
    Ok(())
}

async fn cmd_dump(config: ScoutConfig, url: String, tag: String, headful: bool) -> Result<()> {
    let session = open(&config, &url, headful).await?;
    let writer = DiagnosticWriter::from_config(&config.diagnostics);

    let bundle = writer
        .capture(&session, BundleTag::from(tag.as_str()))
        .await
        .context("Diagnostics could not be written (see log)")?;

    println!("{}", bundle.note.display());
    if let Some(html) = &bundle.page_source {
        println!("{}", html.display());
    }
    if let Some(png) = &bundle.screenshot {
        println!("{}", png.display());
    }

    session.close().await?;
    Ok(())
}

async fn cmd_diagnostics(config: ScoutConfig) -> Result<()> {
    let writer = DiagnosticWriter::from_config(&config.diagnostics);
    let bundles = writer.list().await?;

    if bundles.is_empty() {
        println!("No diagnostics in {}", writer.dir().display());
        return Ok(());
    }

    for bundle in bundles {
        println!(
            "{}  {:<16} {}{}",
            bundle.created_at.format("%Y-%m-%d %H:%M:%S%.3f"),
            bundle.tag.to_string(),
            bundle.note.display(),
            if bundle.screenshot.is_some() { " (+png)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_config(root: &Path, config: ScoutConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = ScoutConfig::write_default(root)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
