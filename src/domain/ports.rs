use crate::domain::message::ChangeNotification;
use crate::domain::model::{AddressDuration, CommuteAddress, TrackedKey, TrackedValue};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

pub trait PageStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

pub trait StorageArea: Send + Sync {
    fn get(&self, key: TrackedKey)
        -> impl std::future::Future<Output = Result<Option<Value>>> + Send;
    fn set(
        &self,
        key: TrackedKey,
        value: Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification>;
}

#[async_trait]
pub trait TrackedStore: Send + Sync {
    async fn get(&self, key: TrackedKey) -> Result<TrackedValue>;
    async fn set(&self, value: TrackedValue) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
pub trait DurationsProvider: Send + Sync {
    async fn durations(&self, addresses: &[CommuteAddress]) -> Result<Vec<AddressDuration>>;
}
