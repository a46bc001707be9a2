// Adapters layer: concrete implementations of the domain ports (storage, http).

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileStorageArea;
pub use http::HttpDurationsProvider;
pub use memory::{MemoryPageStorage, MemoryStorageArea};
