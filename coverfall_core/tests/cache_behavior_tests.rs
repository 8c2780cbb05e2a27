//! Time-dependent cache behavior, driven on a paused tokio clock

use coverfall_core::cache::{ImageStatusCache, ENTRY_TTL, MAX_RETRIES};
use coverfall_core::probe::ProbeOutcome;
use coverfall_core::types::LoadStatus;
use coverfall_test_utils::MockProber;
use std::time::Duration;

const URL: &str = "https://example.com/cover.jpg";

#[tokio::test(start_paused = true)]
async fn status_entry_survives_until_its_ttl() {
    let cache = ImageStatusCache::new();
    cache.set(URL, LoadStatus::Loaded);

    tokio::time::advance(ENTRY_TTL - Duration::from_secs(60)).await;
    assert!(cache.get(URL).is_some(), "still fresh one minute before TTL");

    tokio::time::advance(Duration::from_secs(120)).await;
    assert!(cache.get(URL).is_none(), "expired one minute past TTL");
}

#[tokio::test(start_paused = true)]
async fn expiry_resets_the_retry_budget() {
    let cache = ImageStatusCache::new();
    cache.set(URL, LoadStatus::Error);
    for _ in 0..MAX_RETRIES {
        cache.increment_retry(URL);
    }
    assert!(!cache.should_retry(URL));

    tokio::time::advance(ENTRY_TTL + Duration::from_secs(1)).await;
    assert!(
        cache.should_retry(URL),
        "an expired failure is forgotten along with its retry count"
    );
}

#[tokio::test(start_paused = true)]
async fn bulk_eviction_removes_the_oldest_entries_first() {
    let cache = ImageStatusCache::with_limits(ENTRY_TTL, 10);
    for i in 0..10 {
        cache.set(&format!("u{i}"), LoadStatus::Loaded);
        tokio::time::advance(Duration::from_secs(1)).await;
    }

    cache.set("overflow", LoadStatus::Loaded);

    assert!(cache.get("u0").is_none(), "oldest entry evicted");
    assert!(cache.get("u1").is_none(), "second-oldest entry evicted");
    for i in 2..10 {
        assert!(cache.get(&format!("u{i}")).is_some(), "u{i} survives");
    }
    assert!(cache.get("overflow").is_some());
}

#[tokio::test(start_paused = true)]
async fn overwriting_an_entry_refreshes_its_ttl() {
    let cache = ImageStatusCache::new();
    cache.set(URL, LoadStatus::Error);

    tokio::time::advance(ENTRY_TTL - Duration::from_secs(60)).await;
    cache.set(URL, LoadStatus::Loaded);

    tokio::time::advance(Duration::from_secs(120)).await;
    let entry = cache.get(URL).unwrap();
    assert_eq!(entry.status, LoadStatus::Loaded, "rewrite restarted the clock");
}

#[tokio::test]
async fn preload_settles_every_url_and_counts_successes() {
    let cache = ImageStatusCache::new();
    let prober = MockProber::succeeding();
    prober.respond_with("https://example.com/bad.jpg", ProbeOutcome::Unreachable);

    let urls = vec![
        "https://example.com/a.jpg".to_string(),
        "https://example.com/bad.jpg".to_string(),
        "https://example.com/b.jpg".to_string(),
    ];
    let loaded = cache.preload_images(&prober, &urls).await;

    assert_eq!(loaded, 2);
    assert_eq!(prober.call_count(), 3, "failures do not stop the batch");
    assert_eq!(
        cache.get("https://example.com/a.jpg").unwrap().status,
        LoadStatus::Loaded
    );
    let bad = cache.get("https://example.com/bad.jpg").unwrap();
    assert_eq!(bad.status, LoadStatus::Error);
    assert_eq!(bad.retry_count, 1);
}
