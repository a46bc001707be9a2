use crate::core::bridge::PageBridge;
use crate::core::transport::PendingReply;
use crate::domain::model::{
    CommuteAddress, MaxDurations, TrackedKey, TrackedValue, DEFAULT_MAX_DURATIONS,
};
use crate::domain::ports::{PageStorage, TrackedStore};
use crate::utils::error::{Result, SyncError};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

enum StoreOp {
    Set(TrackedValue),
    Clear(oneshot::Sender<Result<()>>),
    Barrier(oneshot::Sender<()>),
}

/// 特權儲存區的寫入佇列。單一工作者依送出順序逐一完成，前一個 `set` 結束後才處理下一個
#[derive(Clone)]
pub struct StoreQueue {
    sender: mpsc::UnboundedSender<StoreOp>,
}

impl StoreQueue {
    pub fn new(store: Arc<dyn TrackedStore>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<StoreOp>();
        let worker = async move {
            while let Some(op) = receiver.recv().await {
                match op {
                    StoreOp::Set(value) => {
                        let key = value.key();
                        if let Err(e) = store.set(value).await {
                            tracing::error!(key = %key, error = %e, "Failed to write privileged storage");
                        }
                    }
                    StoreOp::Clear(done) => {
                        let _ = done.send(store.clear().await);
                    }
                    StoreOp::Barrier(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("privileged write queue closed");
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(worker);
            }
            // 沒有 runtime：接收端隨 worker 一起被丟棄，之後的寫入都會以 ChannelClosed 失敗
            Err(_) => tracing::warn!("no async runtime available, privileged writes disabled"),
        }
        Self { sender }
    }

    fn push(&self, op: StoreOp) -> Result<()> {
        self.sender.send(op).map_err(|_| SyncError::ChannelClosed)
    }

    fn set(&self, value: TrackedValue) -> Result<()> {
        self.push(StoreOp::Set(value))
    }

    fn clear(&self) -> Result<oneshot::Receiver<Result<()>>> {
        let (done, receiver) = oneshot::channel();
        self.push(StoreOp::Clear(done))?;
        Ok(receiver)
    }

    async fn barrier(&self) -> Result<()> {
        let (done, receiver) = oneshot::channel();
        self.push(StoreOp::Barrier(done))?;
        receiver.await.map_err(|_| SyncError::ChannelClosed)
    }
}

#[derive(Clone)]
pub enum ExecutionContext {
    Privileged(StoreQueue),
    Page(Arc<PageBridge>),
}

enum ClearSignal {
    Direct(Result<oneshot::Receiver<Result<()>>>),
    Message(Result<PendingReply>),
}

/// 頁面程式碼讀寫地址與最長通勤時間的入口。
///
/// 讀取永遠是同步的，立即回傳本地值或預設值；較新的資料之後透過事件送達。
/// 寫入失敗只記錄，不會傳給呼叫端。
pub struct StorageFacade {
    local: Arc<dyn PageStorage>,
    context: ExecutionContext,
}

impl StorageFacade {
    /// 需要在 tokio runtime 內建立，寫入佇列的工作者在此啟動
    pub fn privileged(local: Arc<dyn PageStorage>, store: Arc<dyn TrackedStore>) -> Self {
        Self {
            local,
            context: ExecutionContext::Privileged(StoreQueue::new(store)),
        }
    }

    pub fn page(bridge: Arc<PageBridge>) -> Self {
        Self {
            local: bridge.clone(),
            context: ExecutionContext::Page(bridge),
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self.context, ExecutionContext::Privileged(_))
    }

    pub fn save_commute_addresses(&self, addresses: Vec<CommuteAddress>) {
        self.save(TrackedValue::CommuteAddresses(addresses));
    }

    pub fn save_max_durations(&self, max_durations: MaxDurations) {
        self.save(TrackedValue::MaxDurations(max_durations));
    }

    fn save(&self, value: TrackedValue) {
        let key = value.key();
        if let Err(e) = self.write_through(value) {
            tracing::error!(key = %key, error = %e, "Failed to save value");
        }
    }

    fn write_through(&self, value: TrackedValue) -> Result<()> {
        let key = value.key();
        let serialized = value.serialize()?;
        // 頁面環境中 local 是橋接本身，這一步同時完成轉送
        self.local.set_item(key.as_str(), &serialized)?;

        if let ExecutionContext::Privileged(queue) = &self.context {
            queue.set(value)?;
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        match &self.context {
            ExecutionContext::Privileged(queue) => queue.barrier().await,
            ExecutionContext::Page(bridge) => bridge.flush().await,
        }
    }

    pub fn get_commute_addresses(&self) -> Vec<CommuteAddress> {
        self.read(TrackedKey::CommuteAddresses).unwrap_or_default()
    }

    pub fn get_max_durations(&self) -> MaxDurations {
        self.read(TrackedKey::MaxDurations)
            .unwrap_or(DEFAULT_MAX_DURATIONS)
    }

    fn read<T: DeserializeOwned>(&self, key: TrackedKey) -> Option<T> {
        match self.local.get_item(key.as_str()) {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Failed to parse stored value");
                    None
                }
            },
            Ok(_) => {
                // 頁面沒有資料：向閘道要，結果透過事件送達
                if let ExecutionContext::Page(bridge) = &self.context {
                    bridge.refresh(key);
                }
                None
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to read page storage");
                None
            }
        }
    }

    /// 本地儲存在呼叫時就同步清除；回傳的 future 在特權儲存區清除後才完成
    pub fn clear_addresses(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        for key in TrackedKey::ALL {
            if let Err(e) = self.local.remove_item(key.as_str()) {
                tracing::error!(key = %key, error = %e, "Failed to clear page storage");
            }
        }

        let signal = match &self.context {
            ExecutionContext::Privileged(queue) => ClearSignal::Direct(queue.clear()),
            ExecutionContext::Page(bridge) => ClearSignal::Message(bridge.forward_clear()),
        };

        async move {
            let result = match signal {
                ClearSignal::Direct(done) => match done {
                    Ok(done) => done.await.unwrap_or(Err(SyncError::ChannelClosed)),
                    Err(e) => Err(e),
                },
                ClearSignal::Message(pending) => match pending {
                    Ok(pending) => pending.wait().await.map(|_| ()),
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = &result {
                tracing::error!(error = %e, "Failed to clear privileged storage");
            }
            result
        }
    }
}
