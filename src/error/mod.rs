//! Error types for the bridge.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection to {server} failed: {message}")]
    Connect { server: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Bridge manager has been disposed")]
    Disposed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid safety pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl BridgeError {
    /// Create a connect error for a named server.
    pub fn connect(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::ConfigParse(_) | Self::Pattern(_) => {
                ErrorCategory::Configuration
            }
            Self::Connect { .. } => ErrorCategory::Connect,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Transport(_) | Self::Io(_) => ErrorCategory::Transport,
            Self::Provider { .. } | Self::ToolExecution { .. } | Self::InvalidArgument(_) => {
                ErrorCategory::Execution
            }
            Self::Cancelled(_) => ErrorCategory::Cancelled,
            Self::Disposed => ErrorCategory::Lifecycle,
            Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }

    /// Whether another connection attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connect | ErrorCategory::Timeout | ErrorCategory::Transport
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Connect | ErrorCategory::Transport => {
                RecoverySuggestion::ReconnectLater
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Execution => RecoverySuggestion::CheckToolArguments,
            ErrorCategory::Lifecycle => RecoverySuggestion::CreateNewManager,
            _ => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
