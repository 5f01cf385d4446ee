use std::time::Duration;

use lcmp_core::pool::PoolConfig;
use lcmp_core::{FetchError, SourceError, fetch_inventory};
use lcmp_testkit::{InMemoryEnvironment, lambda_record};

fn pool(max_workers: usize, secs: u64) -> PoolConfig {
    PoolConfig {
        max_workers,
        task_timeout: Duration::from_secs(secs),
    }
}

fn numbered(count: usize) -> InMemoryEnvironment {
    InMemoryEnvironment::new("old")
        .with_functions((0..count).map(|i| lambda_record(&format!("svc-{i:02}-lambda"))))
}

#[tokio::test]
async fn one_failed_detail_fetch_drops_only_that_function() {
    let (env, stats) = numbered(50)
        .fail_function("svc-17-lambda", "throttled")
        .with_page_size(20)
        .into_environment();

    let inventory = fetch_inventory(&env, &pool(10, 30)).await.unwrap();

    assert_eq!(inventory.len(), 49);
    assert!(!inventory.contains("svc-17-lambda"));
    assert_eq!(inventory.dropped(), ["svc-17-lambda".to_string()]);
    assert_eq!(stats.detail_calls(), 50);
    assert_eq!(stats.listings(), 1);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_on_a_detail_fetch_aborts_the_environment() {
    let (env, stats) = numbered(50)
        .with_latency(Duration::from_secs(20))
        .fail_function_auth("svc-00-lambda")
        .into_environment();
    let started = tokio::time::Instant::now();

    let err = fetch_inventory(&env, &pool(10, 30)).await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(err.environment(), "old");
    // surfaces with the first batch of fetches
    assert!(started.elapsed() < Duration::from_secs(40), "took {:?}", started.elapsed());
    assert!(stats.detail_calls() < 50, "{} detail calls", stats.detail_calls());
}

#[tokio::test]
async fn listing_failure_is_fatal_for_the_environment() {
    let (env, stats) = numbered(25)
        .with_page_size(10)
        .fail_listing(SourceError::transient("service unavailable"))
        .into_environment();

    let err = fetch_inventory(&env, &pool(4, 30)).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Listing {
            source: SourceError::Transient(_),
            ..
        }
    ));
    // no fan-out starts before the listing is drained
    assert_eq!(stats.detail_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_listing_times_out_as_a_listing_failure() {
    let (env, stats) = numbered(25)
        .with_page_size(10)
        .stall_listing()
        .into_environment();

    let err = fetch_inventory(&env, &pool(4, 5)).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Listing {
            source: SourceError::Timeout(limit),
            ..
        } if limit == Duration::from_secs(5)
    ));
    assert_eq!(stats.detail_calls(), 0);
}

#[tokio::test]
async fn expired_credentials_during_listing_report_auth() {
    let (env, _) = numbered(3)
        .fail_listing(SourceError::auth("ExpiredToken"))
        .into_environment();

    let err = fetch_inventory(&env, &pool(4, 30)).await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test(start_paused = true)]
async fn timed_out_detail_fetch_is_dropped() {
    let (env, _) = numbered(5)
        .delay_function("svc-02-lambda", Duration::from_secs(120))
        .into_environment();

    let inventory = fetch_inventory(&env, &pool(5, 1)).await.unwrap();

    assert_eq!(inventory.len(), 4);
    assert_eq!(inventory.dropped(), ["svc-02-lambda".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn detail_fetches_respect_worker_limit() {
    let (env, stats) = numbered(30)
        .with_latency(Duration::from_millis(50))
        .into_environment();

    let inventory = fetch_inventory(&env, &pool(4, 30)).await.unwrap();

    assert_eq!(inventory.len(), 30);
    assert!(stats.max_in_flight() <= 4, "peak {}", stats.max_in_flight());
    assert!(stats.max_in_flight() > 1);
}

#[tokio::test]
async fn empty_environment_yields_empty_inventory() {
    let (env, _) = InMemoryEnvironment::new("new").into_environment();
    let inventory = fetch_inventory(&env, &pool(4, 30)).await.unwrap();
    assert!(inventory.is_empty());
    assert!(inventory.dropped().is_empty());
}
