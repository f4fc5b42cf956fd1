use thiserror::Error;

/// Errors returned by the Langfuse API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("failed to make request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status code {status}, response body: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cannot find {id} in {scope}")]
    NotFound { id: String, scope: String },

    #[error("failed to delete {id}{}", message_suffix(.message))]
    DeleteFailed { id: String, message: Option<String> },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Create a new NotFound error
    pub fn not_found(id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            scope: scope.into(),
        }
    }

    /// Create a new DeleteFailed error
    pub fn delete_failed(id: impl Into<String>, message: Option<String>) -> Self {
        Self::DeleteFailed {
            id: id.into(),
            message: message.filter(|m| !m.is_empty()),
        }
    }

    /// Create a new Http error
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// True when the entity was absent on lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status code, if the server answered with a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Coarse classification, logged with every failed call.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::DeleteFailed { .. } => ErrorCategory::DeleteFailed,
        }
    }
}

/// Error categories for logging and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Serialization,
    Transport,
    Http,
    Decode,
    NotFound,
    DeleteFailed,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization => write!(f, "serialization"),
            Self::Transport => write!(f, "transport"),
            Self::Http => write!(f, "http"),
            Self::Decode => write!(f, "decode"),
            Self::NotFound => write!(f, "not_found"),
            Self::DeleteFailed => write!(f, "delete_failed"),
        }
    }
}

/// Convenience result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
