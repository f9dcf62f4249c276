use lookout_browser::{BrowserContext, BrowserEngine, HumanTiming, StealthSession};
use lookout_core::{BrowserSettings, Platform, TimingConfig};
use std::sync::Arc;

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_launch() {
    let engine = BrowserEngine::launch(&BrowserSettings::default()).await;
    assert!(engine.is_ok(), "Failed to launch browser engine");
    let engine = engine.unwrap();
    assert!(engine.is_available());
    engine.shutdown().await;
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_stealth_page_hides_webdriver() {
    let engine = BrowserEngine::launch(&BrowserSettings::default())
        .await
        .unwrap();
    let timing = Arc::new(HumanTiming::new(TimingConfig::instant()));
    let mut session = StealthSession::open(
        &engine,
        Platform::Reddit,
        &BrowserSettings::default(),
        timing,
    )
    .await
    .unwrap();

    session.navigate("https://example.com").await.unwrap();
    let webdriver = session.evaluate("navigator.webdriver === undefined").await.unwrap();
    assert_eq!(webdriver, serde_json::Value::Bool(true));
    assert!(!session.detect_rate_limit().await);

    session.close().await;
    engine.shutdown().await;
}
