use thiserror::Error;

/// Core error types for todos operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Todo not found: {id}")]
    TodoNotFound { id: u64 },

    #[error("Invalid record data: {message}")]
    InvalidRecord { message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a new TodoNotFound error
    pub fn todo_not_found(id: u64) -> Self {
        Self::TodoNotFound { id }
    }

    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TodoNotFound { .. } | Self::InvalidRecord { .. } | Self::JsonError(_)
        )
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TodoNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Serialization,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
