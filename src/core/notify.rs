use crate::domain::model::{CommuteAddress, MaxDurations, TrackedValue};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "kebab-case")]
pub enum SyncEvent {
    AddressesUpdated {
        addresses: Vec<CommuteAddress>,
    },
    MaxDurationsUpdated {
        #[serde(rename = "maxDurations")]
        max_durations: MaxDurations,
    },
    CleanAddressDurations {
        #[serde(rename = "validAddressIds")]
        valid_address_ids: Vec<String>,
    },
}

impl SyncEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::AddressesUpdated { .. } => "addresses-updated",
            SyncEvent::MaxDurationsUpdated { .. } => "max-durations-updated",
            SyncEvent::CleanAddressDurations { .. } => "clean-address-durations",
        }
    }

    pub fn updated(value: &TrackedValue) -> Self {
        match value {
            TrackedValue::CommuteAddresses(addresses) => SyncEvent::AddressesUpdated {
                addresses: addresses.clone(),
            },
            TrackedValue::MaxDurations(max_durations) => SyncEvent::MaxDurationsUpdated {
                max_durations: *max_durations,
            },
        }
    }

    pub fn clean_address_durations(addresses: &[CommuteAddress]) -> Self {
        SyncEvent::CleanAddressDurations {
            valid_address_ids: addresses.iter().map(|a| a.id.clone()).collect(),
        }
    }
}

pub type Subscriber = Arc<dyn Fn(&SyncEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 同步、同執行緒的事件分發。單一訂閱者失敗不會影響其他訂閱者
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers().push((id, Arc::new(subscriber)));
        tracing::debug!(subscription = id.0, "subscriber registered");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    pub fn publish(&self, event: &SyncEvent) -> usize {
        // 先複製一份，訂閱者在回呼中可以再訂閱或取消訂閱
        let snapshot: Vec<(SubscriptionId, Subscriber)> = self.subscribers().clone();
        let mut delivered = 0;

        for (id, subscriber) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        event = event.name(),
                        subscription = id.0,
                        error = %e,
                        "subscriber failed to handle event"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        event = event.name(),
                        subscription = id.0,
                        "subscriber panicked while handling event"
                    );
                }
            }
        }

        tracing::debug!(event = event.name(), delivered, "event published");
        delivered
    }
}
