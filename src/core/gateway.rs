use crate::core::transport::RequestReceiver;
use crate::domain::message::{ChangeNotification, Reply, Request, Response};
use crate::domain::model::{CommuteAddress, MaxDurations, TrackedKey, TrackedValue};
use crate::domain::ports::{DurationsProvider, StorageArea, TrackedStore};
use crate::utils::error::Result;
use crate::utils::validation::validate_address_ids;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// 特權程序中的權威儲存與訊息路由
pub struct StorageGateway<S: StorageArea> {
    area: S,
    durations: Arc<dyn DurationsProvider>,
}

impl<S: StorageArea> StorageGateway<S> {
    pub fn new(area: S, durations: Arc<dyn DurationsProvider>) -> Self {
        Self { area, durations }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.area.subscribe()
    }

    pub async fn get(&self, key: TrackedKey) -> Result<TrackedValue> {
        match self.area.get(key).await? {
            Some(raw) => TrackedValue::from_json(key, raw),
            None => Ok(key.default_value()),
        }
    }

    pub async fn set(&self, value: TrackedValue) -> Result<()> {
        if let TrackedValue::CommuteAddresses(addresses) = &value {
            validate_address_ids("addresses", addresses)?;
        }
        let key = value.key();
        self.area.set(key, value.to_json()?).await?;
        tracing::debug!(key = %key, "privileged value stored");
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<(Vec<CommuteAddress>, MaxDurations)> {
        let addresses = match self.get(TrackedKey::CommuteAddresses).await? {
            TrackedValue::CommuteAddresses(addresses) => addresses,
            TrackedValue::MaxDurations(_) => Vec::new(),
        };
        let max_durations = match self.get(TrackedKey::MaxDurations).await? {
            TrackedValue::MaxDurations(max_durations) => max_durations,
            TrackedValue::CommuteAddresses(_) => MaxDurations::default(),
        };
        Ok((addresses, max_durations))
    }

    pub async fn clear(&self) -> Result<()> {
        for key in TrackedKey::ALL {
            self.area.set(key, key.empty_value().to_json()?).await?;
        }
        tracing::info!("privileged storage cleared");
        Ok(())
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        match request {
            Request::FetchAddresses => {
                Ok(Response::from_tracked(self.get(TrackedKey::CommuteAddresses).await?))
            }
            Request::FetchMaxDurations => {
                Ok(Response::from_tracked(self.get(TrackedKey::MaxDurations).await?))
            }
            Request::SaveAddresses { addresses } => {
                self.set(TrackedValue::CommuteAddresses(addresses.clone()))
                    .await?;
                Ok(Response::Ack)
            }
            Request::SaveMaxDurations { max_durations } => {
                self.set(TrackedValue::MaxDurations(*max_durations)).await?;
                Ok(Response::Ack)
            }
            Request::ClearAll => {
                self.clear().await?;
                Ok(Response::Ack)
            }
            Request::ComputeDurations { addresses } => {
                let address_durations = self.durations.durations(addresses).await?;
                Ok(Response::AddressDurations { address_durations })
            }
        }
    }

    /// 處理一個請求。失敗以錯誤回覆表示，不會拋出
    pub async fn handle(&self, request: &Request) -> Reply {
        match self.dispatch(request).await {
            Ok(response) => Reply::ok(response),
            Err(e) => {
                tracing::warn!(kind = request.kind(), error = %e, "request failed");
                Reply::err(e.to_string())
            }
        }
    }

    pub async fn handle_json(&self, raw: Value) -> Reply {
        match serde_json::from_value::<Request>(raw) {
            Ok(request) => self.handle(&request).await,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed message");
                Reply::err(format!("Unsupported request: {}", e))
            }
        }
    }

    /// 依序處理，一個請求完成後才處理下一個
    pub async fn serve(&self, mut requests: RequestReceiver) {
        tracing::info!("storage gateway listening");
        while let Some(envelope) = requests.recv().await {
            let reply = self.handle(&envelope.request).await;
            if !envelope.respond(reply) {
                tracing::debug!("requester went away before the reply");
            }
        }
        tracing::info!("request channel closed, storage gateway stopped");
    }
}

#[async_trait]
impl<S: StorageArea> TrackedStore for StorageGateway<S> {
    async fn get(&self, key: TrackedKey) -> Result<TrackedValue> {
        StorageGateway::get(self, key).await
    }

    async fn set(&self, value: TrackedValue) -> Result<()> {
        StorageGateway::set(self, value).await
    }

    async fn clear(&self) -> Result<()> {
        StorageGateway::clear(self).await
    }
}
