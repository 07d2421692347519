use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

static COMPLETION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `chatcmpl-{unix_millis}-{n}`; unique for the lifetime of the process.
pub fn next_completion_id() -> String {
    let n = COMPLETION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("chatcmpl-{millis}-{n}")
}

/// Seconds since the epoch.
pub fn unix_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| next_completion_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("chatcmpl-")));
    }
}
