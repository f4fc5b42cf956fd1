use std::sync::Arc;

use async_trait::async_trait;
use langfuse_api::{ClientFactory, OrganizationClient, ProjectApiKey};
use serde::{Deserialize, Serialize};

use super::{Change, Resource, required};
use crate::address::ResourceKind;
use crate::error::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectApiKeyConfig {
    pub project_id: Option<String>,
    pub organization_public_key: Option<String>,
    pub organization_private_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectApiKeyState {
    pub id: String,
    pub project_id: String,
    pub public_key: String,
    pub secret_key: String,
    pub organization_public_key: String,
    pub organization_private_key: String,
}

impl ProjectApiKeyState {
    fn merge(&self, remote: ProjectApiKey) -> Self {
        Self {
            id: remote.id,
            ..self.clone()
        }
    }
}

pub struct ProjectApiKeyResource {
    clients: Arc<dyn ClientFactory>,
}

impl ProjectApiKeyResource {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        Self { clients }
    }

    fn client_for_state(&self, state: &ProjectApiKeyState) -> Arc<dyn OrganizationClient> {
        self.clients
            .organization_client(&state.organization_public_key, &state.organization_private_key)
    }
}

#[async_trait]
impl Resource for ProjectApiKeyResource {
    type Config = ProjectApiKeyConfig;
    type State = ProjectApiKeyState;

    const KIND: ResourceKind = ResourceKind::ProjectApiKey;
    const UPDATABLE: bool = false;

    async fn create(
        &self,
        config: &ProjectApiKeyConfig,
    ) -> Result<ProjectApiKeyState, ResourceError> {
        let project_id = required(Self::KIND, "project_id", &config.project_id)?;
        let public_key = required(
            Self::KIND,
            "organization_public_key",
            &config.organization_public_key,
        )?;
        let private_key = required(
            Self::KIND,
            "organization_private_key",
            &config.organization_private_key,
        )?;

        let key = self
            .clients
            .organization_client(public_key, private_key)
            .create_project_api_key(project_id)
            .await
            .map_err(|e| ResourceError::api("Error creating project API key", e))?;

        tracing::info!(project_id, key_id = %key.id, "created project API key");
        Ok(ProjectApiKeyState {
            id: key.id,
            project_id: project_id.to_string(),
            public_key: key.public_key.unwrap_or_default(),
            secret_key: key.secret_key.unwrap_or_default(),
            organization_public_key: public_key.to_string(),
            organization_private_key: private_key.to_string(),
        })
    }

    async fn read(
        &self,
        state: &ProjectApiKeyState,
    ) -> Result<Option<ProjectApiKeyState>, ResourceError> {
        match self
            .client_for_state(state)
            .find_project_api_key(&state.project_id, &state.id)
            .await
        {
            Ok(remote) => Ok(Some(state.merge(remote))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    project_id = %state.project_id,
                    key_id = %state.id,
                    "project API key no longer exists"
                );
                Ok(None)
            }
            Err(e) => Err(ResourceError::api("Error reading project API key", e)),
        }
    }

    async fn update(
        &self,
        _config: &ProjectApiKeyConfig,
        _state: &ProjectApiKeyState,
    ) -> Result<ProjectApiKeyState, ResourceError> {
        Err(ResourceError::UpdateNotSupported {
            resource: Self::KIND,
        })
    }

    async fn delete(&self, state: &ProjectApiKeyState) -> Result<(), ResourceError> {
        self.client_for_state(state)
            .delete_project_api_key(&state.project_id, &state.id)
            .await
            .map_err(|e| ResourceError::api("Error deleting project API key", e))
    }

    /// The key keeps the pair it was created with; only the project matters.
    fn diff(&self, config: &ProjectApiKeyConfig, state: &ProjectApiKeyState) -> Change {
        if config.project_id.as_deref() == Some(state.project_id.as_str()) {
            Change::NoChange
        } else {
            Change::Replace
        }
    }
}
