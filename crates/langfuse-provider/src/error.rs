use std::path::PathBuf;

use langfuse_api::ApiError;
use thiserror::Error;

use crate::address::{Address, ResourceKind};

/// Failure of a single reconciler phase.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{summary}")]
    Api {
        summary: String,
        #[source]
        error: ApiError,
    },

    #[error("{resource}: missing required attribute `{attribute}`")]
    MissingAttribute {
        resource: ResourceKind,
        attribute: &'static str,
    },

    #[error("{resource} cannot be updated in place; changing it requires replacement")]
    UpdateNotSupported { resource: ResourceKind },

    #[error("invalid {resource} configuration: {error}")]
    InvalidConfig {
        resource: ResourceKind,
        #[source]
        error: serde_json::Error,
    },

    #[error("corrupt {resource} state record: {error}")]
    CorruptState {
        resource: ResourceKind,
        #[source]
        error: serde_json::Error,
    },
}

impl ResourceError {
    /// Wrap a client failure with a short summary of the phase that failed
    pub fn api(summary: impl Into<String>, error: ApiError) -> Self {
        Self::Api {
            summary: summary.into(),
            error,
        }
    }

    /// Create a new MissingAttribute error
    pub fn missing(resource: ResourceKind, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            resource,
            attribute,
        }
    }

    /// The client error behind this failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("state file {} is not valid JSON: {error}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("unsupported state file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("failed to encode state for {address}: {error}")]
    Encode {
        address: Address,
        #[source]
        error: serde_json::Error,
    },

    #[error("state record for {address} does not match its kind: {error}")]
    Decode {
        address: Address,
        #[source]
        error: serde_json::Error,
    },

    #[error("failed to stamp state file: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Errors loading or resolving the desired-state document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document {}: {error}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown resource kind `{0}`")]
    UnknownKind(String),

    #[error("invalid resource address `{0}`")]
    InvalidAddress(String),

    #[error("{address}: resource body must be a table")]
    NotATable { address: Address },

    #[error("{address}: invalid reference `{reference}`")]
    InvalidReference { address: Address, reference: String },

    #[error("{address}: reference to `{target}` must point at a kind applied earlier")]
    ForwardReference { address: Address, target: Address },

    #[error("{address}: reference to undeclared resource `{target}`")]
    UndeclaredReference { address: Address, target: Address },

    #[error("{address}: `{target}.{attribute}` is not known")]
    UnresolvedReference {
        address: Address,
        target: Address,
        attribute: String,
    },
}

/// Errors of a plan/apply/refresh/destroy run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{address}")]
    Resource {
        address: Address,
        #[source]
        error: ResourceError,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl EngineError {
    pub fn resource(address: &Address, error: ResourceError) -> Self {
        Self::Resource {
            address: address.clone(),
            error,
        }
    }
}
