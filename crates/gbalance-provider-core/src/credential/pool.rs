use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::state::{Credential, CredentialHealth, KeyStatus, KeyValidity};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("no upstream credentials configured")]
    NoCredentialsAvailable,
}

#[derive(Debug)]
struct Slot {
    credential: Credential,
    health: CredentialHealth,
}

#[derive(Debug)]
struct PoolState {
    slots: Vec<Slot>,
    /// Rotation start for the next selection.
    cursor: usize,
    max_failures: u32,
    health_window: Duration,
}

/// Health-tracked rotation over the configured upstream keys.
///
/// All state sits behind one mutex; `select` and `record_outcome` each hold it
/// for their whole read-modify-write.
#[derive(Debug)]
pub struct KeyPool {
    state: Mutex<PoolState>,
}

impl KeyPool {
    pub fn new(keys: &[String], max_failures: u32, health_window: Duration) -> Self {
        Self {
            state: Mutex::new(PoolState {
                slots: keys
                    .iter()
                    .map(|key| Slot {
                        credential: Credential::new(key.as_str()),
                        health: CredentialHealth::default(),
                    })
                    .collect(),
                cursor: 0,
                max_failures,
                health_window,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.slots.is_empty()
    }

    /// Round-robin over valid credentials. When none is valid, fails open to
    /// the credential with the fewest current failures.
    pub async fn select(&self) -> Result<Credential, SelectError> {
        self.select_at(OffsetDateTime::now_utc()).await
    }

    pub async fn select_at(&self, now: OffsetDateTime) -> Result<Credential, SelectError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let count = state.slots.len();
        if count == 0 {
            return Err(SelectError::NoCredentialsAvailable);
        }

        let start = state.cursor % count;
        let window = state.health_window;
        let max_failures = state.max_failures;

        let valid = (0..count)
            .map(|offset| (start + offset) % count)
            .find(|index| state.slots[*index].health.is_valid(now, window, max_failures));

        let index = match valid {
            Some(index) => index,
            None => (0..count)
                .map(|offset| (start + offset) % count)
                .min_by_key(|index| state.slots[*index].health.effective_failures(now, window))
                .unwrap_or(start),
        };

        state.cursor = (index + 1) % count;
        Ok(state.slots[index].credential.clone())
    }

    /// Outcomes for credentials no longer in the pool (removed by a config
    /// swap while the request was in flight) are ignored.
    pub async fn record_outcome(&self, credential: &Credential, success: bool, model: Option<&str>) {
        self.record_outcome_at(credential, success, model, OffsetDateTime::now_utc())
            .await;
    }

    pub async fn record_outcome_at(
        &self,
        credential: &Credential,
        success: bool,
        model: Option<&str>,
        now: OffsetDateTime,
    ) {
        let mut guard = self.state.lock().await;
        let window = guard.health_window;
        let Some(slot) = guard
            .slots
            .iter_mut()
            .find(|slot| slot.credential == *credential)
        else {
            return;
        };
        if success {
            slot.health.record_success(now, model);
        } else {
            slot.health.record_failure(now, window);
        }
    }

    /// Replaces the key set. Retained keys keep their health, new keys start
    /// healthy, removed keys are dropped.
    pub async fn sync_credentials(&self, keys: &[String]) {
        let mut guard = self.state.lock().await;
        let mut previous = std::mem::take(&mut guard.slots);
        guard.slots = keys
            .iter()
            .map(|key| {
                let retained = previous
                    .iter()
                    .position(|slot| slot.credential.value() == key.as_str())
                    .map(|index| previous.swap_remove(index));
                retained.unwrap_or_else(|| Slot {
                    credential: Credential::new(key.as_str()),
                    health: CredentialHealth::default(),
                })
            })
            .collect();
        if guard.cursor >= guard.slots.len() {
            guard.cursor = 0;
        }
    }

    pub async fn set_policy(&self, max_failures: u32, health_window: Duration) {
        let mut guard = self.state.lock().await;
        guard.max_failures = max_failures;
        guard.health_window = health_window;
    }

    pub async fn statuses(&self) -> Vec<KeyStatus> {
        self.statuses_at(OffsetDateTime::now_utc()).await
    }

    pub async fn statuses_at(&self, now: OffsetDateTime) -> Vec<KeyStatus> {
        let guard = self.state.lock().await;
        guard
            .slots
            .iter()
            .map(|slot| {
                let fail_count = slot.health.effective_failures(now, guard.health_window);
                KeyStatus {
                    key: slot.credential.redacted(),
                    status: if fail_count < guard.max_failures {
                        KeyValidity::Valid
                    } else {
                        KeyValidity::Invalid
                    },
                    fail_count,
                    last_used_at: slot.health.last_used_at,
                    last_used_model: slot.health.last_used_model.clone(),
                }
            })
            .collect()
    }

    /// Zeroes one key's failures. Returns whether the key is in the pool.
    pub async fn reset(&self, key: &str) -> bool {
        let mut guard = self.state.lock().await;
        match guard
            .slots
            .iter_mut()
            .find(|slot| slot.credential.value() == key)
        {
            Some(slot) => {
                slot.health.reset();
                true
            }
            None => false,
        }
    }

    pub async fn reset_all(&self) {
        let mut guard = self.state.lock().await;
        for slot in guard.slots.iter_mut() {
            slot.health.reset();
        }
    }

    pub async fn health(&self, credential: &Credential) -> Option<CredentialHealth> {
        let guard = self.state.lock().await;
        guard
            .slots
            .iter()
            .find(|slot| slot.credential == *credential)
            .map(|slot| slot.health.clone())
    }
}
