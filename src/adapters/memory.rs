use crate::domain::message::ChangeNotification;
use crate::domain::model::TrackedKey;
use crate::domain::ports::{PageStorage, StorageArea};
use crate::utils::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct MemoryPageStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl PageStorage for MemoryPageStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStorageArea {
    values: Arc<tokio::sync::Mutex<HashMap<TrackedKey, Value>>>,
    changes: broadcast::Sender<ChangeNotification>,
}

impl MemoryStorageArea {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            changes,
        }
    }
}

impl Default for MemoryStorageArea {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageArea for MemoryStorageArea {
    async fn get(&self, key: TrackedKey) -> Result<Option<Value>> {
        let values = self.values.lock().await;
        Ok(values.get(&key).cloned())
    }

    async fn set(&self, key: TrackedKey, value: Value) -> Result<()> {
        {
            let mut values = self.values.lock().await;
            values.insert(key, value.clone());
        }
        // 沒有訂閱者時 send 會失敗，這是正常情況
        let _ = self.changes.send(ChangeNotification {
            key,
            new_value: Some(value),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.changes.subscribe()
    }
}
