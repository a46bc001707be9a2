pub mod bridge;
pub mod durations;
pub mod facade;
pub mod gateway;
pub mod notify;
pub mod transport;

pub use crate::domain::model::{TrackedKey, TrackedValue};
pub use crate::domain::ports::{DurationsProvider, PageStorage, StorageArea, TrackedStore};
pub use crate::utils::error::Result;
