use thiserror::Error;

#[derive(Error, Debug)]
pub enum PairingError {
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    #[error("Bind request for item {item_id} was superseded by a newer request")]
    Superseded { item_id: String },

    #[error("Bind request for item {item_id} was cancelled")]
    Cancelled { item_id: String },

    #[error("Bind request for item {item_id} timed out")]
    TimedOut { item_id: String },

    #[error("Invalid tag identifier: {value:?}")]
    InvalidTag { value: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Pairing,
    Input,
    Storage,
    Network,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PairingError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ItemNotFound { .. }
            | Self::Superseded { .. }
            | Self::Cancelled { .. }
            | Self::TimedOut { .. } => ErrorCategory::Pairing,
            Self::InvalidTag { .. } => ErrorCategory::Input,
            Self::IoError(_) | Self::SerializationError(_) | Self::StoreError { .. } => {
                ErrorCategory::Storage
            }
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 正常的配對結果，呼叫端可以直接重試
            Self::Superseded { .. } | Self::Cancelled { .. } | Self::TimedOut { .. } => {
                ErrorSeverity::Low
            }
            Self::ItemNotFound { .. } | Self::InvalidTag { .. } | Self::HttpError(_) => {
                ErrorSeverity::Medium
            }
            Self::StoreError { .. } | Self::SerializationError(_) => ErrorSeverity::High,
            Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ItemNotFound { .. } => "Create the item first, then request the binding again",
            Self::Superseded { .. } => "Another bind request took over; retry if this item still needs a tag",
            Self::Cancelled { .. } => "The pairing was reset; request the binding again",
            Self::TimedOut { .. } => "Scan the tag sooner or raise the bind timeout",
            Self::InvalidTag { .. } => "Check the reader output; tag identifiers must not be empty",
            Self::IoError(_) => "Check that the store file is readable and its directory writable",
            Self::SerializationError(_) => "Check that the store file contains valid JSON",
            Self::HttpError(_) => "Check that the pairing server is running and reachable",
            Self::StoreError { .. } => "Inspect the store contents for conflicting records",
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration value and restart"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ItemNotFound { item_id } => format!("No item with id '{}' exists", item_id),
            Self::Superseded { item_id } => {
                format!("Binding for '{}' was replaced by a newer request", item_id)
            }
            Self::Cancelled { item_id } => format!("Binding for '{}' was cancelled", item_id),
            Self::TimedOut { item_id } => format!("No tag was scanned for '{}' in time", item_id),
            Self::InvalidTag { .. } => "The scanned tag identifier is empty".to_string(),
            Self::HttpError(_) => "Could not reach the pairing server".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PairingError>;
