use std::sync::Arc;

use async_trait::async_trait;
use langfuse_api::{AdminClient, OrganizationApiKey};
use serde::{Deserialize, Serialize};

use super::{Change, Resource, required};
use crate::address::ResourceKind;
use crate::error::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationApiKeyConfig {
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationApiKeyState {
    pub id: String,
    pub organization_id: String,
    pub public_key: String,
    pub secret_key: String,
}

impl OrganizationApiKeyState {
    /// Only the id comes from the listing; the keys exist nowhere but here.
    fn merge(&self, remote: OrganizationApiKey) -> Self {
        Self {
            id: remote.id,
            organization_id: self.organization_id.clone(),
            public_key: self.public_key.clone(),
            secret_key: self.secret_key.clone(),
        }
    }
}

pub struct OrganizationApiKeyResource {
    admin: Arc<dyn AdminClient>,
}

impl OrganizationApiKeyResource {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }
}

#[async_trait]
impl Resource for OrganizationApiKeyResource {
    type Config = OrganizationApiKeyConfig;
    type State = OrganizationApiKeyState;

    const KIND: ResourceKind = ResourceKind::OrganizationApiKey;
    const UPDATABLE: bool = false;

    async fn create(
        &self,
        config: &OrganizationApiKeyConfig,
    ) -> Result<OrganizationApiKeyState, ResourceError> {
        let organization_id = required(Self::KIND, "organization_id", &config.organization_id)?;

        let key = self
            .admin
            .create_organization_api_key(organization_id)
            .await
            .map_err(|e| ResourceError::api("Error creating organization API key", e))?;

        tracing::info!(organization_id, key_id = %key.id, "created organization API key");
        Ok(OrganizationApiKeyState {
            id: key.id,
            organization_id: organization_id.to_string(),
            public_key: key.public_key.unwrap_or_default(),
            secret_key: key.secret_key.unwrap_or_default(),
        })
    }

    async fn read(
        &self,
        state: &OrganizationApiKeyState,
    ) -> Result<Option<OrganizationApiKeyState>, ResourceError> {
        match self
            .admin
            .find_organization_api_key(&state.organization_id, &state.id)
            .await
        {
            Ok(remote) => Ok(Some(state.merge(remote))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    organization_id = %state.organization_id,
                    key_id = %state.id,
                    "organization API key no longer exists"
                );
                Ok(None)
            }
            Err(e) => Err(ResourceError::api("Error reading organization API key", e)),
        }
    }

    async fn update(
        &self,
        _config: &OrganizationApiKeyConfig,
        _state: &OrganizationApiKeyState,
    ) -> Result<OrganizationApiKeyState, ResourceError> {
        Err(ResourceError::UpdateNotSupported {
            resource: Self::KIND,
        })
    }

    async fn delete(&self, state: &OrganizationApiKeyState) -> Result<(), ResourceError> {
        self.admin
            .delete_organization_api_key(&state.organization_id, &state.id)
            .await
            .map_err(|e| ResourceError::api("Error deleting organization API key", e))
    }

    fn diff(&self, config: &OrganizationApiKeyConfig, state: &OrganizationApiKeyState) -> Change {
        if config.organization_id.as_deref() == Some(state.organization_id.as_str()) {
            Change::NoChange
        } else {
            Change::Replace
        }
    }
}
