use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use gbalance_provider_core::{Credential, KeyPool, KeyValidity, SelectError};
use time::OffsetDateTime;

const WINDOW: Duration = Duration::from_secs(24 * 3600);

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[tokio::test]
async fn empty_pool_reports_no_credentials() {
    let pool = KeyPool::new(&[], 5, WINDOW);
    assert_eq!(
        pool.select().await.unwrap_err(),
        SelectError::NoCredentialsAvailable
    );
}

#[tokio::test]
async fn rotates_round_robin_over_valid_keys() {
    let pool = KeyPool::new(&keys(&["k1", "k2", "k3"]), 5, WINDOW);
    let mut picked = Vec::new();
    for _ in 0..6 {
        picked.push(pool.select().await.unwrap().value().to_string());
    }
    assert_eq!(picked, vec!["k1", "k2", "k3", "k1", "k2", "k3"]);
}

#[tokio::test]
async fn failing_key_leaves_rotation_until_success() {
    let pool = KeyPool::new(&keys(&["bad", "good"]), 5, WINDOW);
    let bad = Credential::new("bad");
    for _ in 0..5 {
        pool.record_outcome(&bad, false, None).await;
    }

    for _ in 0..4 {
        assert_eq!(pool.select().await.unwrap().value(), "good");
    }

    pool.record_outcome(&bad, true, Some("gemini-1.5-flash")).await;
    let picked: HashSet<String> = {
        let mut out = HashSet::new();
        for _ in 0..2 {
            out.insert(pool.select().await.unwrap().value().to_string());
        }
        out
    };
    assert!(picked.contains("bad"));
}

#[tokio::test]
async fn fails_open_to_least_failed_key() {
    let pool = KeyPool::new(&keys(&["a", "b"]), 2, WINDOW);
    let a = Credential::new("a");
    let b = Credential::new("b");
    for _ in 0..3 {
        pool.record_outcome(&a, false, None).await;
    }
    for _ in 0..2 {
        pool.record_outcome(&b, false, None).await;
    }
    assert_eq!(pool.select().await.unwrap(), b);
    assert_eq!(pool.select().await.unwrap(), b);
}

#[tokio::test]
async fn stale_failures_fall_out_of_window() {
    let pool = KeyPool::new(&keys(&["old", "other"]), 1, WINDOW);
    let old = Credential::new("old");
    let then = OffsetDateTime::now_utc() - time::Duration::hours(30);
    pool.record_outcome_at(&old, false, None, then).await;

    let statuses = pool.statuses().await;
    assert_eq!(statuses[0].status, KeyValidity::Valid);
    assert_eq!(statuses[0].fail_count, 0);
    assert_eq!(pool.select().await.unwrap(), old);
}

#[tokio::test]
async fn concurrent_failures_are_not_lost() {
    let pool = Arc::new(KeyPool::new(&keys(&["k"]), 1000, WINDOW));
    let credential = Credential::new("k");
    let mut tasks = Vec::new();
    for _ in 0..64 {
        let pool = pool.clone();
        let credential = credential.clone();
        tasks.push(tokio::spawn(async move {
            pool.record_outcome(&credential, false, None).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let health = pool.health(&credential).await.unwrap();
    assert_eq!(health.consecutive_failures, 64);
}

#[tokio::test]
async fn sync_keeps_health_of_retained_keys() {
    let pool = KeyPool::new(&keys(&["keep", "drop"]), 5, WINDOW);
    let keep = Credential::new("keep");
    pool.record_outcome(&keep, false, None).await;
    pool.record_outcome(&Credential::new("drop"), false, None)
        .await;

    pool.sync_credentials(&keys(&["keep", "new"])).await;

    assert_eq!(pool.len().await, 2);
    assert_eq!(pool.health(&keep).await.unwrap().consecutive_failures, 1);
    assert_eq!(
        pool.health(&Credential::new("new"))
            .await
            .unwrap()
            .consecutive_failures,
        0
    );
    assert!(pool.health(&Credential::new("drop")).await.is_none());

    // Outcomes for a removed key are ignored.
    pool.record_outcome(&Credential::new("drop"), false, None)
        .await;
    assert!(pool.health(&Credential::new("drop")).await.is_none());
}

#[tokio::test]
async fn statuses_and_reset() {
    let pool = KeyPool::new(&keys(&["AIzaSyA1234567890abcdefXYZ", "k2"]), 2, WINDOW);
    let first = Credential::new("AIzaSyA1234567890abcdefXYZ");
    pool.record_outcome(&first, false, None).await;
    pool.record_outcome(&first, false, None).await;
    pool.record_outcome(&Credential::new("k2"), true, Some("gemini-pro"))
        .await;

    let statuses = pool.statuses().await;
    assert_eq!(statuses[0].key, "AIzaSy...defXYZ");
    assert_eq!(statuses[0].status, KeyValidity::Invalid);
    assert_eq!(statuses[0].fail_count, 2);
    assert_eq!(statuses[1].status, KeyValidity::Valid);
    assert_eq!(statuses[1].last_used_model.as_deref(), Some("gemini-pro"));
    assert!(statuses[1].last_used_at.is_some());

    assert!(pool.reset("AIzaSyA1234567890abcdefXYZ").await);
    assert!(!pool.reset("missing").await);
    assert_eq!(pool.statuses().await[0].status, KeyValidity::Valid);

    pool.record_outcome(&first, false, None).await;
    pool.reset_all().await;
    assert_eq!(pool.statuses().await[0].fail_count, 0);
}
