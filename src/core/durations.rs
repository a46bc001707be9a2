use crate::core::notify::{EventBus, SubscriptionId, SyncEvent};
use crate::core::transport::Transport;
use crate::domain::message::{ApiResponse, Request, Response};
use crate::domain::model::{AddressDuration, CommuteAddress, MaxDurations, TravelMode};
use std::sync::{Arc, Mutex, MutexGuard};

/// 請特權程序計算通勤時間。失敗會放在 `error`，不會回傳 Err
pub async fn fetch_address_durations(
    transport: &Transport,
    addresses: Vec<CommuteAddress>,
) -> ApiResponse<Vec<AddressDuration>> {
    match transport
        .request(Request::ComputeDurations { addresses })
        .await
    {
        Ok(Response::AddressDurations { address_durations }) => {
            ApiResponse::ok(address_durations)
        }
        Ok(other) => ApiResponse::err(format!("Unexpected reply: {}", other.kind())),
        Err(e) => {
            tracing::warn!(error = %e, "Extension API request failed");
            ApiResponse::err(e.to_string())
        }
    }
}

#[derive(Debug, Default)]
pub struct DurationsCache {
    entries: Mutex<Option<Vec<AddressDuration>>>,
}

impl DurationsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Option<Vec<AddressDuration>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn replace(&self, durations: Vec<AddressDuration>) {
        *self.entries() = Some(durations);
    }

    pub fn snapshot(&self) -> Option<Vec<AddressDuration>> {
        self.entries().clone()
    }

    pub fn retain_valid(&self, valid_address_ids: &[String]) -> usize {
        let mut entries = self.entries();
        let Some(current) = entries.as_mut() else {
            return 0;
        };

        let before = current.len();
        current.retain(|entry| valid_address_ids.contains(&entry.address.id));
        let removed = before - current.len();
        if current.is_empty() {
            *entries = None;
        }
        removed
    }

    pub fn exceeding(&self, max_durations: &MaxDurations) -> Vec<(String, TravelMode)> {
        let entries = self.entries();
        let Some(current) = entries.as_ref() else {
            return Vec::new();
        };

        let mut exceeded = Vec::new();
        for entry in current {
            for mode in TravelMode::ALL {
                if let (Some(minutes), Some(limit)) =
                    (entry.durations.get(mode), max_durations.get(mode))
                {
                    if minutes > limit {
                        exceeded.push((entry.address.id.clone(), mode));
                    }
                }
            }
        }
        exceeded
    }

    /// 訂閱清除事件。元件拆除時呼叫 `EventBus::unsubscribe`
    pub fn attach(self: &Arc<Self>, events: &EventBus) -> SubscriptionId {
        let cache = Arc::downgrade(self);
        events.subscribe(move |event| {
            if let SyncEvent::CleanAddressDurations { valid_address_ids } = event {
                if let Some(cache) = cache.upgrade() {
                    let removed = cache.retain_valid(valid_address_ids);
                    tracing::debug!(removed, "stale address durations dropped");
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport;
    use crate::domain::message::Reply;
    use crate::domain::model::Durations;

    fn entry(id: &str, walking: u32, driving: u32) -> AddressDuration {
        AddressDuration {
            address: CommuteAddress::new(id, format!("{} street", id)),
            durations: Durations {
                walking: Some(walking),
                driving: Some(driving),
                transit: None,
                biking: None,
            },
        }
    }

    #[test]
    fn test_cleanup_event_drops_removed_addresses() {
        let events = EventBus::new();
        let cache = Arc::new(DurationsCache::new());
        cache.replace(vec![entry("A", 40, 10), entry("B", 50, 12), entry("C", 60, 14)]);
        cache.attach(&events);

        events.publish(&SyncEvent::CleanAddressDurations {
            valid_address_ids: vec!["A".to_string(), "C".to_string()],
        });

        let ids: Vec<String> = cache
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|e| e.address.id)
            .collect();
        assert_eq!(ids, vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_cache_becomes_none_when_everything_is_removed() {
        let cache = DurationsCache::new();
        cache.replace(vec![entry("A", 40, 10)]);

        assert_eq!(cache.retain_valid(&[]), 1);
        assert_eq!(cache.snapshot(), None);
        assert_eq!(cache.retain_valid(&[]), 0);
    }

    #[test]
    fn test_exceeding_ignores_unset_limits() {
        let cache = DurationsCache::new();
        cache.replace(vec![entry("A", 40, 10), entry("B", 10, 45)]);
        let max = MaxDurations {
            driving: Some(30),
            ..MaxDurations::default()
        };

        assert_eq!(
            cache.exceeding(&max),
            vec![("B".to_string(), TravelMode::Driving)]
        );
    }

    #[test]
    fn test_dropped_cache_ignores_events() {
        let events = EventBus::new();
        let cache = Arc::new(DurationsCache::new());
        cache.attach(&events);
        drop(cache);

        let delivered = events.publish(&SyncEvent::CleanAddressDurations {
            valid_address_ids: vec![],
        });
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_structured() {
        let (transport, mut requests) = transport::channel();
        tokio::spawn(async move {
            while let Some(envelope) = requests.recv().await {
                envelope.respond(Reply::err("API responded with status: 503"));
            }
        });

        let response =
            fetch_address_durations(&transport, vec![CommuteAddress::new("A", "Damrak 1")]).await;

        assert!(!response.is_ok());
        assert_eq!(response.data, None);
        assert!(response.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_on_closed_channel_is_structured() {
        let (transport, requests) = transport::channel();
        drop(requests);

        let response = fetch_address_durations(&transport, vec![]).await;
        assert_eq!(response.data, None);
        assert!(response.error.is_some());
    }
}
