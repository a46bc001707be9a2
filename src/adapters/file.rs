use crate::adapters::memory::CHANGE_CHANNEL_CAPACITY;
use crate::domain::message::ChangeNotification;
use crate::domain::model::TrackedKey;
use crate::domain::ports::StorageArea;
use crate::utils::error::{Result, SyncError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// 以單一 JSON 檔保存的特權儲存區，跨程序重啟仍然存在
#[derive(Debug, Clone)]
pub struct FileStorageArea {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<ChangeNotification>,
}

impl FileStorageArea {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
            changes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            SyncError::storage_area(format!("{} is not a JSON object: {}", self.path.display(), e))
        })
    }
}

impl StorageArea for FileStorageArea {
    async fn get(&self, key: TrackedKey) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let values = self.read_all().await?;
        Ok(values.get(key.as_str()).cloned())
    }

    async fn set(&self, key: TrackedKey, value: Value) -> Result<()> {
        {
            let _guard = self.lock.lock().await;
            let mut values = self.read_all().await?;
            values.insert(key.as_str().to_string(), value.clone());

            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            let data = serde_json::to_vec_pretty(&values)?;
            tokio::fs::write(&self.path, data).await?;
            tracing::debug!(key = %key, path = %self.path.display(), "storage file written");
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        let area = FileStorageArea::new(&path);
        assert_eq!(area.get(TrackedKey::CommuteAddresses).await.unwrap(), None);
        area.set(TrackedKey::CommuteAddresses, json!([{"id": "a"}]))
            .await
            .unwrap();

        let reopened = FileStorageArea::new(&path);
        assert_eq!(
            reopened.get(TrackedKey::CommuteAddresses).await.unwrap(),
            Some(json!([{"id": "a"}]))
        );

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["uprent:commute-addresses"], json!([{"id": "a"}]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let area = FileStorageArea::new(&path);
        let result = area.get(TrackedKey::MaxDurations).await;
        assert!(matches!(result, Err(SyncError::StorageAreaError { .. })));
    }

    #[tokio::test]
    async fn test_set_notifies_subscribers() {
        let temp_dir = TempDir::new().unwrap();
        let area = FileStorageArea::new(temp_dir.path().join("store.json"));
        let mut changes = area.subscribe();

        area.set(TrackedKey::MaxDurations, json!({}))
            .await
            .unwrap();

        let notification = changes.recv().await.unwrap();
        assert_eq!(notification.key, TrackedKey::MaxDurations);
        assert_eq!(notification.new_value, Some(json!({})));
    }
}
