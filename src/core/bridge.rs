use crate::core::notify::{EventBus, SyncEvent};
use crate::core::transport::{PendingReply, Transport};
use crate::domain::message::{ChangeNotification, Request};
use crate::domain::model::{TrackedKey, TrackedValue};
use crate::domain::ports::PageStorage;
use crate::utils::error::{Result, SyncError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Forwarding,
    Applying,
}

#[derive(Debug, Default, Clone, Copy)]
struct KeyState {
    in_flight: usize,
    applying: bool,
}

type StateMap = Arc<Mutex<HashMap<TrackedKey, KeyState>>>;

fn lock_states(states: &StateMap) -> MutexGuard<'_, HashMap<TrackedKey, KeyState>> {
    states
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn update_state(states: &StateMap, key: TrackedKey, f: impl FnOnce(&mut KeyState)) {
    let mut states = lock_states(states);
    f(states.entry(key).or_default());
}

struct BridgeInner {
    local: Arc<dyn PageStorage>,
    transport: Transport,
    events: Arc<EventBus>,
    states: StateMap,
}

impl BridgeInner {
    fn forward(&self, value: TrackedValue) {
        let key = value.key();
        update_state(&self.states, key, |state| state.in_flight += 1);

        let states = self.states.clone();
        self.transport.send_then(Request::save(value), move |result| {
            update_state(&states, key, |state| {
                state.in_flight = state.in_flight.saturating_sub(1)
            });
            match result {
                Ok(_) => tracing::debug!(key = %key, "local write forwarded"),
                // 不重試：下次成功同步或重新載入頁面時會收斂
                Err(e) => tracing::error!(key = %key, error = %e, "Error syncing to privileged storage"),
            }
        });
    }

    /// 遠端通知的寫入路徑：直接寫底層儲存，不經過攔截點
    fn apply_value(&self, value: &TrackedValue) -> Result<()> {
        let key = value.key();
        let serialized = value.serialize().map_err(|e| {
            tracing::error!(key = %key, error = %e, "Error serializing remote value");
            e
        })?;

        update_state(&self.states, key, |state| state.applying = true);
        let written = self.local.set_item(key.as_str(), &serialized);
        if let Err(e) = written {
            update_state(&self.states, key, |state| state.applying = false);
            tracing::error!(key = %key, error = %e, "Error updating page storage");
            return Err(e);
        }

        self.events.publish(&SyncEvent::updated(value));
        if let TrackedValue::CommuteAddresses(addresses) = value {
            self.events
                .publish(&SyncEvent::clean_address_durations(addresses));
        }
        update_state(&self.states, key, |state| state.applying = false);

        tracing::debug!(key = %key, "remote value applied");
        Ok(())
    }

    fn apply(&self, notification: ChangeNotification) -> Result<()> {
        let key = notification.key;
        let raw = match notification.new_value {
            Some(raw) => raw,
            None => key.empty_value().to_json()?,
        };

        // 解析失敗時保留頁面上原有的值
        let value = TrackedValue::from_json(key, raw).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Discarding malformed update");
            e
        })?;
        self.apply_value(&value)
    }

    async fn fetch(&self, key: TrackedKey) -> Result<TrackedValue> {
        let response = self.transport.request(Request::fetch(key)).await?;
        let kind = response.kind();
        match response.into_tracked() {
            Some(value) if value.key() == key => Ok(value),
            _ => Err(SyncError::UnexpectedReply {
                expected: key.to_string(),
                got: kind.to_string(),
            }),
        }
    }

    fn refresh(self: &Arc<Self>, key: TrackedKey) {
        let inner = self.clone();
        self.transport
            .send_then(Request::fetch(key), move |result| {
                let value = result.and_then(|response| {
                    let kind = response.kind();
                    response
                        .into_tracked()
                        .filter(|value| value.key() == key)
                        .ok_or_else(|| SyncError::UnexpectedReply {
                            expected: key.to_string(),
                            got: kind.to_string(),
                        })
                });
                match value {
                    Ok(value) => {
                        let _ = inner.apply_value(&value);
                    }
                    Err(e) => {
                        tracing::error!(key = %key, error = %e, "Error retrieving value from privileged storage")
                    }
                }
            });
    }
}

/// 頁面端同步橋接。
///
/// 頁面程式碼透過 [`PageStorage::set_item`] 寫入時，值會先寫進本地儲存再轉送到閘道；
/// 閘道送來的變更則走另一條直接寫入底層儲存的路徑，因此套用遠端值永遠不會再被轉送回去。
pub struct PageBridge {
    inner: Arc<BridgeInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl PageBridge {
    pub fn new(local: Arc<dyn PageStorage>, transport: Transport, events: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                local,
                transport,
                events,
                states: Arc::new(Mutex::new(HashMap::new())),
            }),
            listener: Mutex::new(None),
        }
    }

    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    pub fn state(&self, key: TrackedKey) -> SyncState {
        let states = lock_states(&self.inner.states);
        match states.get(&key) {
            Some(state) if state.applying => SyncState::Applying,
            Some(state) if state.in_flight > 0 => SyncState::Forwarding,
            _ => SyncState::Idle,
        }
    }

    /// 開始監聽變更通知，並無條件向閘道取得兩個值
    pub async fn start(&self, mut changes: broadcast::Receiver<ChangeNotification>) {
        {
            let mut listener = self.listener();
            if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
                tracing::warn!("page bridge already started");
                return;
            }

            let inner = self.inner.clone();
            *listener = Some(tokio::spawn(async move {
                loop {
                    match changes.recv().await {
                        Ok(notification) => {
                            let _ = inner.apply(notification);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "change notifications dropped, re-fetching");
                            for key in TrackedKey::ALL {
                                inner.refresh(key);
                            }
                        }
                        Err(RecvError::Closed) => {
                            tracing::info!("change notifications closed, page bridge listener stopped");
                            break;
                        }
                    }
                }
            }));
        }

        for key in TrackedKey::ALL {
            match self.inner.fetch(key).await {
                Ok(value) => {
                    let _ = self.inner.apply_value(&value);
                }
                Err(e) => tracing::error!(key = %key, error = %e, "Error during sync initialization"),
            }
        }
        tracing::info!("page bridge initialized");
    }

    pub fn stop(&self) {
        if let Some(handle) = self.listener().take() {
            handle.abort();
            tracing::info!("page bridge stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn apply(&self, notification: ChangeNotification) -> Result<()> {
        self.inner.apply(notification)
    }

    /// 非同步向閘道取得目前的值，結果透過事件送達
    pub fn refresh(&self, key: TrackedKey) {
        self.inner.refresh(key);
    }

    pub fn forward_clear(&self) -> Result<PendingReply> {
        self.inner.transport.send(Request::ClearAll)
    }

    /// 等待一次來回；回傳時先前送出的訊息都已處理完
    pub async fn flush(&self) -> Result<()> {
        self.inner
            .transport
            .request(Request::FetchMaxDurations)
            .await
            .map(|_| ())
    }

    pub(crate) fn remove_local(&self, key: TrackedKey) -> Result<()> {
        self.inner.local.remove_item(key.as_str())
    }
}

impl PageStorage for PageBridge {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner.local.get_item(key)
    }

    /// 攔截點：寫入本地後，被追蹤的鍵會轉送到閘道
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.inner.local.set_item(key, value)?;

        let Some(tracked) = TrackedKey::from_storage_key(key) else {
            return Ok(());
        };
        match TrackedValue::parse(tracked, value) {
            Ok(parsed) => self.inner.forward(parsed),
            Err(e) => {
                tracing::error!(key, error = %e, "Error processing page storage change");
            }
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.local.remove_item(key)
    }
}

impl Drop for PageBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
