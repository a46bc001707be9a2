use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Page storage error: {message}")]
    PageStorageError { message: String },

    #[error("Privileged storage error: {message}")]
    StorageAreaError { message: String },

    #[error("Message channel closed before a reply arrived")]
    ChannelClosed,

    #[error("Remote handler failed: {message}")]
    RemoteError { message: String },

    #[error("Unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply { expected: String, got: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with an error: {message}")]
    ApiStatusError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid {field}: {value} ({reason})")]
    ValidationError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::SerializationError(_) | SyncError::UnexpectedReply { .. } => {
                ErrorSeverity::Low
            }
            SyncError::ChannelClosed
            | SyncError::RemoteError { .. }
            | SyncError::ValidationError { .. }
            | SyncError::ApiError(_)
            | SyncError::ApiStatusError { .. } => ErrorSeverity::Medium,
            SyncError::PageStorageError { .. }
            | SyncError::StorageAreaError { .. }
            | SyncError::IoError(_) => ErrorSeverity::High,
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::ChannelClosed | SyncError::RemoteError { .. } | SyncError::UnexpectedReply { .. }
        )
    }

    pub fn page_storage(message: impl Into<String>) -> Self {
        SyncError::PageStorageError {
            message: message.into(),
        }
    }

    pub fn storage_area(message: impl Into<String>) -> Self {
        SyncError::StorageAreaError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
