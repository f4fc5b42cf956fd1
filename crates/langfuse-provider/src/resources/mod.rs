//! Reconcilers, one per entity kind.
//!
//! Each reconciler maps between three shapes: the declared configuration, the
//! API's wire models and the record persisted in the state file. The API
//! does not echo everything back, so every kind has an explicit merge rule
//! that decides which persisted fields survive a read.

mod organization;
mod organization_api_key;
mod project;
mod project_api_key;

pub use organization::{OrganizationConfig, OrganizationResource, OrganizationState};
pub use organization_api_key::{
    OrganizationApiKeyConfig, OrganizationApiKeyResource, OrganizationApiKeyState,
};
pub use project::{ProjectConfig, ProjectResource, ProjectState};
pub use project_api_key::{ProjectApiKeyConfig, ProjectApiKeyResource, ProjectApiKeyState};

use async_trait::async_trait;
use langfuse_api::Metadata;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::address::ResourceKind;
use crate::error::ResourceError;

/// What it takes to move a resource from its recorded state to its declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    NoChange,
    Update,
    /// An immutable attribute changed: delete, then create.
    Replace,
}

/// Four-phase lifecycle of one entity kind.
#[async_trait]
pub trait Resource: Send + Sync {
    type Config: DeserializeOwned + Send + Sync;
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    const KIND: ResourceKind;

    /// Whether [`Resource::update`] can ever succeed for this kind.
    const UPDATABLE: bool;

    /// absent -> present.
    async fn create(&self, config: &Self::Config) -> Result<Self::State, ResourceError>;

    /// present -> present, or `None` when the entity vanished remotely.
    async fn read(&self, state: &Self::State) -> Result<Option<Self::State>, ResourceError>;

    /// present -> present, mutable attributes only.
    async fn update(
        &self,
        config: &Self::Config,
        state: &Self::State,
    ) -> Result<Self::State, ResourceError>;

    /// present -> absent.
    async fn delete(&self, state: &Self::State) -> Result<(), ResourceError>;

    fn diff(&self, config: &Self::Config, state: &Self::State) -> Change;
}

/// Object-safe view of a [`Resource`] over JSON values, so the engine can hold
/// all four kinds behind one type.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn updatable(&self) -> bool;

    async fn create(&self, config: Value) -> Result<Value, ResourceError>;

    async fn read(&self, state: Value) -> Result<Option<Value>, ResourceError>;

    async fn update(&self, config: Value, state: Value) -> Result<Value, ResourceError>;

    async fn delete(&self, state: Value) -> Result<(), ResourceError>;

    fn diff(&self, config: Value, state: Value) -> Result<Change, ResourceError>;
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn kind(&self) -> ResourceKind {
        R::KIND
    }

    fn updatable(&self) -> bool {
        R::UPDATABLE
    }

    async fn create(&self, config: Value) -> Result<Value, ResourceError> {
        let config = decode_config::<R>(config)?;
        let state = Resource::create(self, &config).await?;
        encode_state::<R>(&state)
    }

    async fn read(&self, state: Value) -> Result<Option<Value>, ResourceError> {
        let state = decode_state::<R>(state)?;
        match Resource::read(self, &state).await? {
            Some(refreshed) => encode_state::<R>(&refreshed).map(Some),
            None => Ok(None),
        }
    }

    async fn update(&self, config: Value, state: Value) -> Result<Value, ResourceError> {
        let config = decode_config::<R>(config)?;
        let state = decode_state::<R>(state)?;
        let updated = Resource::update(self, &config, &state).await?;
        encode_state::<R>(&updated)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state = decode_state::<R>(state)?;
        Resource::delete(self, &state).await
    }

    fn diff(&self, config: Value, state: Value) -> Result<Change, ResourceError> {
        let config = decode_config::<R>(config)?;
        let state = decode_state::<R>(state)?;
        Ok(Resource::diff(self, &config, &state))
    }
}

fn decode_config<R: Resource>(config: Value) -> Result<R::Config, ResourceError> {
    serde_json::from_value(config).map_err(|error| ResourceError::InvalidConfig {
        resource: R::KIND,
        error,
    })
}

fn decode_state<R: Resource>(state: Value) -> Result<R::State, ResourceError> {
    serde_json::from_value(state).map_err(|error| ResourceError::CorruptState {
        resource: R::KIND,
        error,
    })
}

fn encode_state<R: Resource>(state: &R::State) -> Result<Value, ResourceError> {
    serde_json::to_value(state).map_err(|error| ResourceError::CorruptState {
        resource: R::KIND,
        error,
    })
}

/// Decode `config` into the configuration type of `kind` without touching the API.
pub fn check_config(kind: ResourceKind, config: Value) -> Result<(), ResourceError> {
    match kind {
        ResourceKind::Organization => decode_config::<OrganizationResource>(config).map(drop),
        ResourceKind::OrganizationApiKey => {
            decode_config::<OrganizationApiKeyResource>(config).map(drop)
        }
        ResourceKind::Project => decode_config::<ProjectResource>(config).map(drop),
        ResourceKind::ProjectApiKey => decode_config::<ProjectApiKeyResource>(config).map(drop),
    }
}

/// A required attribute from the declared configuration. Empty strings count
/// as missing.
pub(crate) fn required<'a>(
    kind: ResourceKind,
    attribute: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ResourceError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ResourceError::missing(kind, attribute)),
    }
}

static NO_METADATA: Metadata = Metadata::new();

/// Metadata for an update body. The API leaves an omitted field untouched, so
/// clearing recorded metadata takes an explicit empty map.
pub(crate) fn metadata_for_update<'a>(
    declared: Option<&'a Metadata>,
    recorded: Option<&Metadata>,
) -> Option<&'a Metadata> {
    match declared {
        Some(metadata) => Some(metadata),
        None if recorded.is_some_and(|m| !m.is_empty()) => Some(&NO_METADATA),
        None => None,
    }
}

/// Absent and empty metadata are the same thing to the API.
pub(crate) fn metadata_eq(a: Option<&Metadata>, b: Option<&Metadata>) -> bool {
    let empty = Metadata::new();
    a.unwrap_or(&empty) == b.unwrap_or(&empty)
}
