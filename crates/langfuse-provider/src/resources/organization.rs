use std::sync::Arc;

use async_trait::async_trait;
use langfuse_api::{AdminClient, Metadata, Organization};
use serde::{Deserialize, Serialize};

use super::{Change, Resource, metadata_eq, metadata_for_update, required};
use crate::address::ResourceKind;
use crate::error::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationState {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl From<Organization> for OrganizationState {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            metadata: org.metadata,
        }
    }
}

/// Organizations are managed with the admin client only.
pub struct OrganizationResource {
    admin: Arc<dyn AdminClient>,
}

impl OrganizationResource {
    pub fn new(admin: Arc<dyn AdminClient>) -> Self {
        Self { admin }
    }
}

#[async_trait]
impl Resource for OrganizationResource {
    type Config = OrganizationConfig;
    type State = OrganizationState;

    const KIND: ResourceKind = ResourceKind::Organization;
    const UPDATABLE: bool = true;

    async fn create(
        &self,
        config: &OrganizationConfig,
    ) -> Result<OrganizationState, ResourceError> {
        let name = required(Self::KIND, "name", &config.name)?;

        let org = self
            .admin
            .create_organization(name, config.metadata.as_ref())
            .await
            .map_err(|e| ResourceError::api("Error creating organization", e))?;

        tracing::info!(organization_id = %org.id, "created organization");
        Ok(org.into())
    }

    async fn read(
        &self,
        state: &OrganizationState,
    ) -> Result<Option<OrganizationState>, ResourceError> {
        match self.admin.get_organization(&state.id).await {
            Ok(org) => Ok(Some(org.into())),
            Err(e) if e.is_not_found() => {
                tracing::warn!(organization_id = %state.id, "organization no longer exists");
                Ok(None)
            }
            Err(e) => Err(ResourceError::api("Error reading organization", e)),
        }
    }

    async fn update(
        &self,
        config: &OrganizationConfig,
        state: &OrganizationState,
    ) -> Result<OrganizationState, ResourceError> {
        let name = required(Self::KIND, "name", &config.name)?;
        let metadata = metadata_for_update(config.metadata.as_ref(), state.metadata.as_ref());

        let org = self
            .admin
            .update_organization(&state.id, name, metadata)
            .await
            .map_err(|e| ResourceError::api("Error updating organization", e))?;

        Ok(org.into())
    }

    async fn delete(&self, state: &OrganizationState) -> Result<(), ResourceError> {
        self.admin
            .delete_organization(&state.id)
            .await
            .map_err(|e| ResourceError::api("Error deleting organization", e))
    }

    fn diff(&self, config: &OrganizationConfig, state: &OrganizationState) -> Change {
        if config.name.as_deref() != Some(state.name.as_str())
            || !metadata_eq(config.metadata.as_ref(), state.metadata.as_ref())
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
    use langfuse_api::ApiError;

    fn config(name: &str) -> OrganizationConfig {
        OrganizationConfig {
            name: Some(name.to_string()),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn create_then_read_matches() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());

        let created = resource.create(&config("Acme")).await.unwrap();
        assert_eq!(created.name, "Acme");

        let read = resource.read(&created).await.unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(fake.calls_by_scope("admin"), 2);
    }

    #[tokio::test]
    async fn create_requires_name() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());

        let err = resource
            .create(&OrganizationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::MissingAttribute { attribute: "name", .. }
        ));
        assert_eq!(fake.calls_by_scope("admin"), 0);
    }

    #[tokio::test]
    async fn update_changes_name_and_metadata() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());
        let created = resource.create(&config("Acme")).await.unwrap();

        let mut desired = config("Acme Corp");
        desired.metadata = Some(Metadata::from([("tier".to_string(), "gold".to_string())]));
        assert_eq!(resource.diff(&desired, &created), Change::Update);

        let updated = resource.update(&desired, &created).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Acme Corp");
        assert_eq!(resource.diff(&desired, &updated), Change::NoChange);
    }

    #[tokio::test]
    async fn removing_metadata_clears_it_remotely() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());
        let mut declared = config("Acme");
        declared.metadata = Some(Metadata::from([("tier".to_string(), "gold".to_string())]));
        let created = resource.create(&declared).await.unwrap();

        let desired = config("Acme");
        assert_eq!(resource.diff(&desired, &created), Change::Update);

        let updated = resource.update(&desired, &created).await.unwrap();
        assert_eq!(resource.diff(&desired, &updated), Change::NoChange);

        let read = resource.read(&updated).await.unwrap().unwrap();
        assert_eq!(resource.diff(&desired, &read), Change::NoChange);
    }

    #[tokio::test]
    async fn read_after_out_of_band_delete_is_absent() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());
        let created = resource.create(&config("Acme")).await.unwrap();

        fake.remove_organization(&created.id);

        assert_eq!(resource.read(&created).await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_surfaces_other_errors() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());
        let created = resource.create(&config("Acme")).await.unwrap();

        fake.fail_next(ApiError::http(500, "boom"));

        let err = resource.read(&created).await.unwrap_err();
        assert_eq!(err.to_string(), "Error reading organization");
        assert_eq!(err.api_error().and_then(ApiError::status), Some(500));
    }

    #[tokio::test]
    async fn delete_with_false_success_flag_fails() {
        let fake = FakeLangfuse::new();
        let resource = OrganizationResource::new(fake.admin());
        let created = resource.create(&config("Acme")).await.unwrap();

        fake.reject_next_delete(Some("organization still has projects"));

        let err = resource.delete(&created).await.unwrap_err();
        assert!(matches!(
            err.api_error(),
            Some(ApiError::DeleteFailed { .. })
        ));
        assert!(resource.read(&created).await.unwrap().is_some());

        resource.delete(&created).await.unwrap();
        assert_eq!(resource.read(&created).await.unwrap(), None);
    }
}
