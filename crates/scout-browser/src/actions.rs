//! Interaction helpers for flaky third-party pages

use crate::error::{Result, ScoutError, SessionError};
use crate::locator::try_match;
use crate::session::Session;
use scout_core::fail_open::fail_open;
use scout_core::{ElementHandle, OverlayConfig, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const SCRIPT_CLICK_FN: &str = "function() { this.scrollIntoView({block: 'center'}); this.click(); return true; }";

/// Removes every node matching the selector passed as the JSON argument;
/// returns the number removed
const REMOVE_OVERLAY_SCRIPT: &str = r#"(function(selector) {
    let removed = 0;
    document.querySelectorAll(selector).forEach(function(el) {
        if (el.parentNode) { el.parentNode.removeChild(el); removed++; }
    });
    return removed;
})"#;

/// Clicks the first visible accept button inside a same-origin consent
/// iframe; returns whether one was clicked
const ACCEPT_IN_FRAME_SCRIPT: &str = r#"(function(selector, labels) {
    const frame = document.querySelector(selector);
    let doc = null;
    try { doc = frame && frame.contentDocument; } catch (e) { return false; }
    if (!doc) { return false; }
    const buttons = Array.from(doc.querySelectorAll("button, input[type='button'], a"));
    for (const button of buttons) {
        const view = doc.defaultView;
        const style = view ? view.getComputedStyle(button) : null;
        if (style && (style.display === 'none' || style.visibility === 'hidden')) { continue; }
        const text = (button.innerText || button.value || '').toLowerCase();
        if (labels.some(function(label) { return text.includes(label); })) {
            button.click();
            return true;
        }
    }
    return false;
})"#;

/// Removes positioned (fixed, sticky, absolute) elements whose top edge sits
/// within the band passed as the argument; returns the number removed
const SWEEP_TOP_SCRIPT: &str = r#"(function(band) {
    let removed = 0;
    Array.from(document.querySelectorAll('body *')).forEach(function(el) {
        try {
            const style = window.getComputedStyle(el);
            const positioned = style.position === 'fixed'
                || style.position === 'sticky'
                || style.position === 'absolute';
            if (positioned && el.parentNode
                && el.getBoundingClientRect().top <= band
                && style.display !== 'none' && style.visibility !== 'hidden') {
                el.parentNode.removeChild(el);
                removed++;
            }
        } catch (e) {}
    });
    return removed;
})"#;

const CONTAINER_POLL: Duration = Duration::from_millis(100);

/// Click an element, falling back to a script click when the native click
/// fails (typically an overlay intercepting it)
pub async fn safe_click(session: &dyn Session, element: &ElementHandle) -> Result<()> {
    click_or_script_click(session, element).await
}

/// [`safe_click`], and when both clicks fail, dismiss overlays and try both
/// again
pub async fn safe_click_with_overlays(
    session: &dyn Session,
    element: &ElementHandle,
    overlays: &OverlayConfig,
) -> Result<()> {
    match click_or_script_click(session, element).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_session_unavailable() => Err(e),
        Err(e) => {
            warn!("Click on {} still blocked ({}), dismissing overlays", element, e);
            dismiss_overlays(session, overlays).await;
            click_or_script_click(session, element).await
        }
    }
}

async fn click_or_script_click(session: &dyn Session, element: &ElementHandle) -> Result<()> {
    match session.click(element).await {
        Ok(()) => {
            debug!("Clicked {}", element);
            Ok(())
        }
        Err(e @ SessionError::Unavailable(_)) => Err(e.into()),
        Err(e) => {
            warn!("Native click on {} failed ({}), retrying via script", element, e);
            match session.call_on(element, SCRIPT_CLICK_FN).await {
                Ok(_) => Ok(()),
                Err(e @ SessionError::Unavailable(_)) => Err(e.into()),
                Err(e) => Err(ScoutError::Browser(format!(
                    "Failed to click {}: {}",
                    element, e
                ))),
            }
        }
    }
}

/// Focus an element and type into it
pub async fn type_text(session: &dyn Session, element: &ElementHandle, text: &str) -> Result<()> {
    session.type_into(element, text).await.map_err(|e| match e {
        e @ SessionError::Unavailable(_) => e.into(),
        other => ScoutError::Browser(format!("Failed to type into {}: {}", element, other)),
    })
}

/// Get consent banners and chat widgets out of the way.
///
/// In order: click an accept button in each present consent container and
/// wait for it to close, remove whatever still matches the overlay selectors,
/// then (when `sweep_top` is set) remove positioned elements in the top band.
///
/// Best effort: failures are logged and skipped. Returns the number of
/// banners accepted plus nodes removed.
pub async fn dismiss_overlays(session: &dyn Session, overlays: &OverlayConfig) -> usize {
    let labels: Vec<String> = overlays
        .accept_labels
        .iter()
        .map(|label| label.to_lowercase())
        .collect();
    let mut dismissed = 0;

    for container in &overlays.containers {
        let accepted = fail_open("accept consent", || {
            accept_consent(session, container, &labels, overlays.container_wait())
        })
        .await;
        if accepted == Some(true) {
            dismissed += 1;
        }
    }

    for selector in &overlays.selectors {
        let script = format!("{}({})", REMOVE_OVERLAY_SCRIPT, json_string(selector));
        let removed = run_counting_script(session, "dismiss overlay", &script).await;
        if removed > 0 {
            debug!("Removed {} overlay node(s) matching {}", removed, selector);
        }
        dismissed += removed;
    }

    if overlays.sweep_top {
        let script = format!("{}({})", SWEEP_TOP_SCRIPT, overlays.top_band_px);
        let removed = run_counting_script(session, "sweep top overlays", &script).await;
        if removed > 0 {
            debug!("Swept {} positioned node(s) from the top {}px", removed, overlays.top_band_px);
        }
        dismissed += removed;
    }

    if dismissed > 0 {
        info!("Dismissed {} blocking overlay(s)", dismissed);
    }
    dismissed
}

/// Click the first visible accept button of a present container, then wait
/// for the container to go away. Ok(false) when there was nothing to accept.
async fn accept_consent(
    session: &dyn Session,
    container: &str,
    labels: &[String],
    wait: Duration,
) -> Result<bool> {
    let container_sel = Selector::css(container);
    if session.find_all(&container_sel).await?.is_empty() {
        return Ok(false);
    }

    let clicked = if container.contains("iframe") {
        let script = format!(
            "{}({}, {})",
            ACCEPT_IN_FRAME_SCRIPT,
            json_string(container),
            serde_json::Value::from(labels.to_vec())
        );
        session.execute_script(&script).await? == serde_json::Value::Bool(true)
    } else {
        click_accept_button(session, container, labels).await?
    };

    if !clicked {
        debug!("No accept button found in {}", container);
        return Ok(false);
    }

    info!("Accepted consent banner {}", container);
    if let Err(e) = wait_until_gone(session, &container_sel, wait, CONTAINER_POLL).await {
        debug!("{} still present after accepting: {}", container, e);
    }
    Ok(true)
}

async fn click_accept_button(session: &dyn Session, container: &str, labels: &[String]) -> Result<bool> {
    // `a, b` must scope each part: `a button, b button`
    let buttons = container
        .split(',')
        .map(|part| format!("{} button", part.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    for button in session.find_all(&Selector::css(buttons)).await? {
        let state = match session.inspect(&button).await {
            Ok(state) => state,
            Err(e @ SessionError::Unavailable(_)) => return Err(e.into()),
            Err(_) => continue,
        };
        if !state.is_visible() {
            continue;
        }

        let text = state.text.to_lowercase();
        if labels.iter().any(|label| text.contains(label.as_str())) {
            if let Err(e) = session.click(&button).await {
                debug!("Accept button {} did not take the click: {}", button, e);
            }
            return Ok(true);
        }
    }

    Ok(false)
}

async fn run_counting_script(session: &dyn Session, operation: &str, script: &str) -> usize {
    let value = fail_open(operation, || async {
        session.execute_script(script).await.map_err(ScoutError::from)
    })
    .await;

    value
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(0)
}

fn json_string(value: &str) -> serde_json::Value {
    serde_json::Value::String(value.to_string())
}

/// Wait until an element matching `selector` is visible and its text
/// contains `expected`
pub async fn wait_for_text(
    session: &dyn Session,
    selector: &Selector,
    expected: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ElementHandle> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(element) = try_match(session, selector).await.map_err(ScoutError::from)? {
            match session.inspect(&element).await {
                Ok(state) if state.text.contains(expected) => return Ok(element),
                Ok(state) => debug!("{} has text {:?}, waiting for {:?}", selector, state.text, expected),
                Err(e @ SessionError::Unavailable(_)) => return Err(e.into()),
                Err(e) => debug!("Inspect failed for {}: {}", selector, e),
            }
        }

        if !pause_until(deadline, poll_interval).await {
            return Err(ScoutError::Timeout {
                what: format!("text {:?} in {}", expected, selector),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    }
}

/// Wait until no visible element matches `selector`.
///
/// No match, hidden matches and detached matches all count as gone. A query
/// that fails outright (e.g. an invalid selector) is an error, not "gone".
pub async fn wait_until_gone(
    session: &dyn Session,
    selector: &Selector,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;

    loop {
        if !still_visible(session, selector).await? {
            debug!("{} is gone", selector);
            return Ok(());
        }

        if !pause_until(deadline, poll_interval).await {
            return Err(ScoutError::Timeout {
                what: format!("{} to disappear", selector),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    }
}

async fn still_visible(session: &dyn Session, selector: &Selector) -> Result<bool> {
    let elements = match session.find_all(selector).await {
        Ok(elements) => elements,
        Err(SessionError::NotFound(_)) | Err(SessionError::StaleElement(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    for element in &elements {
        match session.inspect(element).await {
            Ok(state) if state.is_visible() => return Ok(true),
            Ok(_) | Err(SessionError::NotFound(_)) | Err(SessionError::StaleElement(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(false)
}

/// Sleep one poll interval, capped at the deadline. False once time is up.
async fn pause_until(deadline: Instant, poll_interval: Duration) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    tokio::time::sleep(poll_interval.min(deadline - now)).await;
    true
}
