use std::sync::Arc;

use async_trait::async_trait;
use langfuse_api::{ClientFactory, Metadata, OrganizationClient, Project};
use serde::{Deserialize, Serialize};

use super::{Change, Resource, metadata_eq, metadata_for_update, required};
use crate::address::ResourceKind;
use crate::error::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: Option<String>,
    /// 0 or absent keeps data forever.
    #[serde(default)]
    pub retention_days: Option<i32>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub organization_public_key: Option<String>,
    pub organization_private_key: Option<String>,
}

impl ProjectConfig {
    fn retention(&self) -> i32 {
        self.retention_days.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub retention_days: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub organization_public_key: String,
    pub organization_private_key: String,
}

impl ProjectState {
    /// The listing reports retention as 0, so the recorded value wins along
    /// with the auth pair.
    fn merge(&self, remote: Project) -> Self {
        Self {
            id: remote.id,
            name: remote.name,
            retention_days: self.retention_days,
            metadata: remote.metadata,
            organization_public_key: self.organization_public_key.clone(),
            organization_private_key: self.organization_private_key.clone(),
        }
    }
}

/// Projects authenticate with an organization key pair, taken from the
/// configuration when writing and from the recorded state otherwise.
pub struct ProjectResource {
    clients: Arc<dyn ClientFactory>,
}

impl ProjectResource {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        Self { clients }
    }

    fn client_for_config(
        &self,
        config: &ProjectConfig,
    ) -> Result<Arc<dyn OrganizationClient>, ResourceError> {
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
        Ok(self.clients.organization_client(public_key, private_key))
    }

    fn client_for_state(&self, state: &ProjectState) -> Arc<dyn OrganizationClient> {
        self.clients
            .organization_client(&state.organization_public_key, &state.organization_private_key)
    }

    fn record(config: &ProjectConfig, project: Project, retention_days: i32) -> ProjectState {
        ProjectState {
            id: project.id,
            name: project.name,
            retention_days,
            metadata: project.metadata,
            organization_public_key: config.organization_public_key.clone().unwrap_or_default(),
            organization_private_key: config.organization_private_key.clone().unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Resource for ProjectResource {
    type Config = ProjectConfig;
    type State = ProjectState;

    const KIND: ResourceKind = ResourceKind::Project;
    const UPDATABLE: bool = true;

    async fn create(&self, config: &ProjectConfig) -> Result<ProjectState, ResourceError> {
        let name = required(Self::KIND, "name", &config.name)?;
        let client = self.client_for_config(config)?;

        let project = client
            .create_project(name, config.retention(), config.metadata.as_ref())
            .await
            .map_err(|e| ResourceError::api("Error creating project", e))?;

        tracing::info!(project_id = %project.id, "created project");
        let retention_days = project.retention_days;
        Ok(Self::record(config, project, retention_days))
    }

    async fn read(&self, state: &ProjectState) -> Result<Option<ProjectState>, ResourceError> {
        match self.client_for_state(state).find_project(&state.id).await {
            Ok(project) => Ok(Some(state.merge(project))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(project_id = %state.id, "project no longer exists");
                Ok(None)
            }
            Err(e) => Err(ResourceError::api("Error reading project", e)),
        }
    }

    async fn update(
        &self,
        config: &ProjectConfig,
        state: &ProjectState,
    ) -> Result<ProjectState, ResourceError> {
        let name = required(Self::KIND, "name", &config.name)?;
        let client = self.client_for_config(config)?;
        let metadata = metadata_for_update(config.metadata.as_ref(), state.metadata.as_ref());

        let project = client
            .update_project(&state.id, name, config.retention(), metadata)
            .await
            .map_err(|e| ResourceError::api("Error updating project", e))?;

        Ok(Self::record(config, project, config.retention()))
    }

    async fn delete(&self, state: &ProjectState) -> Result<(), ResourceError> {
        self.client_for_state(state)
            .delete_project(&state.id)
            .await
            .map_err(|e| ResourceError::api("Error deleting project", e))
    }

    fn diff(&self, config: &ProjectConfig, state: &ProjectState) -> Change {
        let same_auth = config.organization_public_key.as_deref()
            == Some(state.organization_public_key.as_str())
            && config.organization_private_key.as_deref()
                == Some(state.organization_private_key.as_str());

        if config.name.as_deref() != Some(state.name.as_str())
            || config.retention() != state.retention_days
            || !metadata_eq(config.metadata.as_ref(), state.metadata.as_ref())
            || !same_auth
        {
            Change::Update
        } else {
            Change::NoChange
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLangfuse;
    use langfuse_api::{AdminClient, ApiError};

    struct Fixture {
        fake: FakeLangfuse,
        resource: ProjectResource,
        public_key: String,
        secret_key: String,
    }

    async fn setup() -> Fixture {
        let fake = FakeLangfuse::new();
        let admin = fake.admin();
        let org = admin.create_organization("Acme", None).await.unwrap();
        let key = admin.create_organization_api_key(&org.id).await.unwrap();
        Fixture {
            resource: ProjectResource::new(fake.factory()),
            public_key: key.public_key.unwrap(),
            secret_key: key.secret_key.unwrap(),
            fake,
        }
    }

    impl Fixture {
        fn config(&self, name: &str, retention_days: Option<i32>) -> ProjectConfig {
            ProjectConfig {
                name: Some(name.to_string()),
                retention_days,
                metadata: None,
                organization_public_key: Some(self.public_key.clone()),
                organization_private_key: Some(self.secret_key.clone()),
            }
        }
    }

    #[tokio::test]
    async fn read_preserves_retention_the_listing_drops() {
        let fx = setup().await;

        let created = fx.resource.create(&fx.config("P1", Some(30))).await.unwrap();
        assert_eq!(created.retention_days, 30);

        let read = fx.resource.read(&created).await.unwrap().unwrap();
        assert_eq!(read.retention_days, 30);
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn update_records_declared_retention() {
        let fx = setup().await;
        let created = fx.resource.create(&fx.config("P1", Some(30))).await.unwrap();

        let desired = fx.config("P1 renamed", Some(90));
        assert_eq!(fx.resource.diff(&desired, &created), Change::Update);

        let updated = fx.resource.update(&desired, &created).await.unwrap();
        assert_eq!(updated.retention_days, 90);
        assert_eq!(updated.name, "P1 renamed");

        let read = fx.resource.read(&updated).await.unwrap().unwrap();
        assert_eq!(read.retention_days, 90);
        assert_eq!(fx.resource.diff(&desired, &read), Change::NoChange);
    }

    #[tokio::test]
    async fn removing_metadata_clears_it_remotely() {
        let fx = setup().await;
        let mut declared = fx.config("P1", Some(30));
        declared.metadata = Some(Metadata::from([("team".to_string(), "web".to_string())]));
        let created = fx.resource.create(&declared).await.unwrap();

        let desired = fx.config("P1", Some(30));
        assert_eq!(fx.resource.diff(&desired, &created), Change::Update);

        let updated = fx.resource.update(&desired, &created).await.unwrap();
        let read = fx.resource.read(&updated).await.unwrap().unwrap();
        assert_eq!(read.metadata, Some(Metadata::new()));
        assert_eq!(fx.resource.diff(&desired, &read), Change::NoChange);
    }

    #[tokio::test]
    async fn every_phase_uses_the_organization_scope() {
        let fx = setup().await;
        let admin_calls = fx.fake.calls_by_scope("admin");

        let created = fx.resource.create(&fx.config("P1", None)).await.unwrap();
        fx.resource.read(&created).await.unwrap();
        fx.resource.delete(&created).await.unwrap();

        assert_eq!(fx.fake.calls_by_scope("admin"), admin_calls);
        assert_eq!(fx.fake.calls_by_scope(&fx.public_key), 3);
    }

    #[tokio::test]
    async fn create_requires_the_key_pair() {
        let fx = setup().await;
        let mut config = fx.config("P1", None);
        config.organization_private_key = None;

        let err = fx.resource.create(&config).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::MissingAttribute {
                attribute: "organization_private_key",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_http_errors() {
        let fx = setup().await;
        let mut config = fx.config("P1", None);
        config.organization_private_key = Some("sk-wrong".into());

        let err = fx.resource.create(&config).await.unwrap_err();
        assert_eq!(err.to_string(), "Error creating project");
        assert_eq!(err.api_error().and_then(ApiError::status), Some(401));
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_project() {
        let fx = setup().await;
        let created = fx.resource.create(&fx.config("P1", None)).await.unwrap();

        fx.fake.reject_next_delete(Some("project is locked"));
        let err = fx.resource.delete(&created).await.unwrap_err();
        assert!(matches!(
            err.api_error(),
            Some(ApiError::DeleteFailed { message: Some(m), .. }) if m == "project is locked"
        ));
        assert!(fx.resource.read(&created).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn read_after_out_of_band_delete_is_absent() {
        let fx = setup().await;
        let created = fx.resource.create(&fx.config("P1", None)).await.unwrap();

        fx.fake.remove_project(&created.id);
        assert_eq!(fx.resource.read(&created).await.unwrap(), None);
    }
}
