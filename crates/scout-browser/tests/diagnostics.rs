//! Integration tests for diagnostic bundle capture.

mod common;

use common::FakeSession;
use scout_browser::{BundleTag, DiagnosticWriter};
use tempfile::TempDir;

#[tokio::test]
async fn test_capture_writes_markup_screenshot_and_note() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path().join("diagnostics"));
    let session = FakeSession::new("<html><body>grid</body></html>");

    let bundle = writer.capture(&session, BundleTag::NoMatch).await.unwrap();

    let html = bundle.page_source.as_ref().unwrap();
    assert_eq!(std::fs::read_to_string(html).unwrap(), "<html><body>grid</body></html>");
    assert!(html.extension().unwrap() == "html");

    let png = bundle.screenshot.as_ref().unwrap();
    assert_eq!(std::fs::read(png).unwrap(), vec![0x89, b'P', b'N', b'G']);

    let note = std::fs::read_to_string(&bundle.note).unwrap();
    assert!(note.contains("Diagnostics generated:"));
    assert!(note.contains("png created"));
}

#[tokio::test]
async fn test_screenshot_failure_is_noted() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path());
    let mut session = FakeSession::new("<html></html>");
    session.screenshot_fails = true;

    let bundle = writer
        .capture(&session, BundleTag::Custom("search-timeout".to_string()))
        .await
        .unwrap();

    assert!(bundle.page_source.is_some());
    assert!(bundle.screenshot.is_none());
    let note = std::fs::read_to_string(&bundle.note).unwrap();
    assert!(note.contains("Screenshot failed"));
    assert!(note.contains("no png"));
}

#[tokio::test]
async fn test_screenshots_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path()).with_screenshots(false);
    let session = FakeSession::new("<html></html>");

    let bundle = writer.capture(&session, BundleTag::NoMatch).await.unwrap();
    assert!(bundle.screenshot.is_none());
}

#[tokio::test]
async fn test_same_tag_twice_does_not_collide() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path());
    let session = FakeSession::new("<html></html>");

    let first = writer.capture(&session, BundleTag::NoMatch).await.unwrap();
    let second = writer.capture(&session, BundleTag::NoMatch).await.unwrap();

    assert_ne!(first.note, second.note);
    assert_ne!(first.page_source, second.page_source);

    let bundles = writer.list().await.unwrap();
    assert_eq!(bundles.len(), 2);
    assert!(bundles.iter().all(|b| b.tag == BundleTag::NoMatch));
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path());
    let session = FakeSession::new("<html></html>");

    writer.capture(&session, BundleTag::NoMatch).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    writer.capture(&session, BundleTag::SessionLost).await.unwrap();

    let bundles = writer.list().await.unwrap();
    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[0].tag, BundleTag::SessionLost);
    assert_eq!(bundles[1].tag, BundleTag::NoMatch);
}

#[tokio::test]
async fn test_list_missing_dir_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path().join("nothing-here"));
    assert!(writer.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unwritable_dir_returns_none() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("file");
    std::fs::write(&file, b"x").unwrap();

    let writer = DiagnosticWriter::new(file.join("diagnostics"));
    let session = FakeSession::new("<html></html>");

    assert!(writer.capture(&session, BundleTag::NoMatch).await.is_none());
}

#[tokio::test]
async fn test_closed_session_still_leaves_a_note() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DiagnosticWriter::new(temp_dir.path());
    let session = FakeSession::new("<html></html>");
    session.close();

    let bundle = writer.capture(&session, BundleTag::SessionLost).await.unwrap();
    assert!(bundle.page_source.is_none());
    assert!(bundle.screenshot.is_none());
    assert!(std::fs::read_to_string(&bundle.note)
        .unwrap()
        .starts_with("Could not get page source"));
}
