pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};
pub use config::SyncConfig;

pub use adapters::{FileStorageArea, HttpDurationsProvider, MemoryPageStorage, MemoryStorageArea};
pub use core::{
    bridge::{PageBridge, SyncState},
    durations::{fetch_address_durations, DurationsCache},
    facade::{ExecutionContext, StorageFacade, StoreQueue},
    gateway::StorageGateway,
    notify::{EventBus, SubscriptionId, SyncEvent},
    transport::{channel, PendingReply, RequestReceiver, Transport},
};
pub use domain::message::{ApiResponse, ChangeNotification, Reply, Request, Response};
pub use domain::model::{
    AddressDuration, CommuteAddress, Durations, MaxDurations, TrackedKey, TrackedValue,
    TravelMode, DEFAULT_MAX_DURATIONS,
};
pub use utils::error::{Result, SyncError};
