//! In-memory stand-in for the Langfuse management API.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use langfuse_api::{
    AdminClient, ApiError, ClientFactory, Metadata, Organization, OrganizationApiKey,
    OrganizationClient, Project, ProjectApiKey, Result,
};

#[derive(Debug, Clone)]
struct StoredKey {
    id: String,
    owner: String,
    public_key: String,
    secret_key: String,
}

#[derive(Debug, Default)]
struct World {
    next_id: usize,
    organizations: BTreeMap<String, Organization>,
    organization_keys: Vec<StoredKey>,
    /// project id -> (owning organization id, project)
    projects: BTreeMap<String, (String, Project)>,
    project_keys: Vec<StoredKey>,
    calls: HashMap<String, usize>,
    fail_next: Option<ApiError>,
    reject_next_delete: Option<Option<String>>,
}

impl World {
    fn next(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    /// Count the call against `scope` and hand out any injected failure.
    fn enter(&mut self, scope: &str) -> Result<()> {
        *self.calls.entry(scope.to_string()).or_default() += 1;
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_delete(&mut self, id: String) -> Result<()> {
        match self.reject_next_delete.take() {
            Some(message) => Err(ApiError::delete_failed(id, message)),
            None => Ok(()),
        }
    }

    fn authenticate(&self, public_key: &str, secret_key: &str) -> Result<String> {
        self.organization_keys
            .iter()
            .find(|k| k.public_key == public_key && k.secret_key == secret_key)
            .map(|k| k.owner.clone())
            .ok_or_else(|| ApiError::http(401, r#"{"message":"Invalid credentials"}"#))
    }
}

/// Shared fake backend. Clones observe the same world.
#[derive(Clone, Default)]
pub(crate) struct FakeLangfuse {
    world: Arc<Mutex<World>>,
}

impl FakeLangfuse {
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    pub fn admin(&self) -> Arc<dyn AdminClient> {
        Arc::new(FakeAdmin { fake: self.clone() })
    }

    pub fn factory(&self) -> Arc<dyn ClientFactory> {
        Arc::new(self.clone())
    }

    /// Number of calls made with the admin key (`"admin"`) or with the given
    /// organization public key.
    pub fn calls_by_scope(&self, scope: &str) -> usize {
        self.world().calls.get(scope).copied().unwrap_or(0)
    }

    pub fn fail_next(&self, error: ApiError) {
        self.world().fail_next = Some(error);
    }

    /// The next delete answers `success: false`.
    pub fn reject_next_delete(&self, message: Option<&str>) {
        self.world().reject_next_delete = Some(message.map(str::to_string));
    }

    pub fn remove_organization(&self, id: &str) {
        self.world().organizations.remove(id);
    }

    pub fn remove_organization_key(&self, id: &str) {
        self.world().organization_keys.retain(|k| k.id != id);
    }

    pub fn remove_project(&self, id: &str) {
        let mut world = self.world();
        world.projects.remove(id);
        world.project_keys.retain(|k| k.owner != id);
    }

    pub fn organization_count(&self) -> usize {
        self.world().organizations.len()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.world().projects.get(id).map(|(_, p)| p.clone())
    }

    pub fn project_count(&self) -> usize {
        self.world().projects.len()
    }

    pub fn organization_key_count(&self) -> usize {
        self.world().organization_keys.len()
    }

    pub fn project_key_count(&self) -> usize {
        self.world().project_keys.len()
    }
}

impl ClientFactory for FakeLangfuse {
    fn admin_client(&self) -> Arc<dyn AdminClient> {
        self.admin()
    }

    fn organization_client(
        &self,
        public_key: &str,
        secret_key: &str,
    ) -> Arc<dyn OrganizationClient> {
        Arc::new(FakeOrganization {
            fake: self.clone(),
            public_key: public_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

struct FakeAdmin {
    fake: FakeLangfuse,
}

#[async_trait]
impl AdminClient for FakeAdmin {
    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        Ok(world.organizations.values().cloned().collect())
    }

    async fn get_organization(&self, org_id: &str) -> Result<Organization> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        world
            .organizations
            .get(org_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("organization {org_id}"), "admin scope"))
    }

    async fn create_organization(
        &self,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        let id = format!("org-{}", world.next());
        let org = Organization {
            id: id.clone(),
            name: name.to_string(),
            metadata: metadata.cloned(),
        };
        world.organizations.insert(id, org.clone());
        Ok(org)
    }

    async fn update_organization(
        &self,
        org_id: &str,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        let org = world
            .organizations
            .get_mut(org_id)
            .ok_or_else(|| ApiError::http(404, "organization not found"))?;
        org.name = name.to_string();
        // An omitted field is left as it was.
        if let Some(metadata) = metadata {
            org.metadata = Some(metadata.clone());
        }
        Ok(org.clone())
    }

    async fn delete_organization(&self, org_id: &str) -> Result<()> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        world.check_delete(format!("organization with ID {org_id}"))?;
        world
            .organizations
            .remove(org_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::http(404, "organization not found"))
    }

    async fn list_organization_api_keys(&self, org_id: &str) -> Result<Vec<OrganizationApiKey>> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        Ok(world
            .organization_keys
            .iter()
            .filter(|k| k.owner == org_id)
            .map(|k| OrganizationApiKey {
                id: k.id.clone(),
                public_key: None,
                secret_key: None,
            })
            .collect())
    }

    async fn find_organization_api_key(
        &self,
        org_id: &str,
        key_id: &str,
    ) -> Result<OrganizationApiKey> {
        self.list_organization_api_keys(org_id)
            .await?
            .into_iter()
            .find(|k| k.id == key_id)
            .ok_or_else(|| {
                ApiError::not_found(
                    format!("API key with ID {key_id}"),
                    format!("organization {org_id}"),
                )
            })
    }

    async fn create_organization_api_key(&self, org_id: &str) -> Result<OrganizationApiKey> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        if !world.organizations.contains_key(org_id) {
            return Err(ApiError::http(404, "organization not found"));
        }
        let n = world.next();
        let key = StoredKey {
            id: format!("oak-{n}"),
            owner: org_id.to_string(),
            public_key: format!("pk-{n}"),
            secret_key: format!("sk-{n}"),
        };
        world.organization_keys.push(key.clone());
        Ok(OrganizationApiKey {
            id: key.id,
            public_key: Some(key.public_key),
            secret_key: Some(key.secret_key),
        })
    }

    async fn delete_organization_api_key(&self, org_id: &str, key_id: &str) -> Result<()> {
        let mut world = self.fake.world();
        world.enter("admin")?;
        world.check_delete(format!("API key with ID {key_id} in organization {org_id}"))?;
        let before = world.organization_keys.len();
        world
            .organization_keys
            .retain(|k| !(k.owner == org_id && k.id == key_id));
        if world.organization_keys.len() == before {
            return Err(ApiError::http(404, "API key not found"));
        }
        Ok(())
    }
}

struct FakeOrganization {
    fake: FakeLangfuse,
    public_key: String,
    secret_key: String,
}

impl FakeOrganization {
    fn session(&self) -> Result<(MutexGuard<'_, World>, String)> {
        let mut world = self.fake.world();
        world.enter(&self.public_key)?;
        let org_id = world.authenticate(&self.public_key, &self.secret_key)?;
        Ok((world, org_id))
    }
}

fn owned_project<'a>(
    world: &'a mut World,
    org_id: &str,
    project_id: &str,
) -> Result<&'a mut Project> {
    match world.projects.get_mut(project_id) {
        Some((owner, project)) if owner == org_id => Ok(project),
        _ => Err(ApiError::http(404, "project not found")),
    }
}

#[async_trait]
impl OrganizationClient for FakeOrganization {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let (world, org_id) = self.session()?;
        Ok(world
            .projects
            .values()
            .filter(|(owner, _)| *owner == org_id)
            .map(|(_, p)| Project {
                retention_days: 0,
                ..p.clone()
            })
            .collect())
    }

    async fn find_project(&self, project_id: &str) -> Result<Project> {
        self.list_projects()
            .await?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| {
                ApiError::not_found(format!("project with ID {project_id}"), "organization")
            })
    }

    async fn create_project(
        &self,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project> {
        let (mut world, org_id) = self.session()?;
        let id = format!("proj-{}", world.next());
        let project = Project {
            id: id.clone(),
            name: name.to_string(),
            retention_days,
            metadata: metadata.cloned(),
        };
        world.projects.insert(id, (org_id, project.clone()));
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: &str,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project> {
        let (mut world, org_id) = self.session()?;
        let project = owned_project(&mut world, &org_id, project_id)?;
        project.name = name.to_string();
        project.retention_days = retention_days;
        if let Some(metadata) = metadata {
            project.metadata = Some(metadata.clone());
        }
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let (mut world, org_id) = self.session()?;
        world.check_delete(format!("project with ID {project_id}"))?;
        owned_project(&mut world, &org_id, project_id)?;
        world.projects.remove(project_id);
        Ok(())
    }

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ProjectApiKey>> {
        let (mut world, org_id) = self.session()?;
        owned_project(&mut world, &org_id, project_id)?;
        Ok(world
            .project_keys
            .iter()
            .filter(|k| k.owner == project_id)
            .map(|k| ProjectApiKey {
                id: k.id.clone(),
                public_key: Some(k.public_key.clone()),
                secret_key: None,
            })
            .collect())
    }

    async fn find_project_api_key(&self, project_id: &str, key_id: &str) -> Result<ProjectApiKey> {
        let keys = match self.list_project_api_keys(project_id).await {
            Err(ApiError::Http { status: 404, .. }) => Vec::new(),
            other => other?,
        };
        keys.into_iter().find(|k| k.id == key_id).ok_or_else(|| {
            ApiError::not_found(
                format!("API key with ID {key_id}"),
                format!("project {project_id}"),
            )
        })
    }

    async fn create_project_api_key(&self, project_id: &str) -> Result<ProjectApiKey> {
        let (mut world, org_id) = self.session()?;
        owned_project(&mut world, &org_id, project_id)?;
        let n = world.next();
        let key = StoredKey {
            id: format!("pak-{n}"),
            owner: project_id.to_string(),
            public_key: format!("pk-proj-{n}"),
            secret_key: format!("sk-proj-{n}"),
        };
        world.project_keys.push(key.clone());
        Ok(ProjectApiKey {
            id: key.id,
            public_key: Some(key.public_key),
            secret_key: Some(key.secret_key),
        })
    }

    async fn delete_project_api_key(&self, project_id: &str, key_id: &str) -> Result<()> {
        let (mut world, _org_id) = self.session()?;
        world.check_delete(format!("API key with ID {key_id} in project {project_id}"))?;
        let before = world.project_keys.len();
        world
            .project_keys
            .retain(|k| !(k.owner == project_id && k.id == key_id));
        if world.project_keys.len() == before {
            return Err(ApiError::http(404, "API key not found"));
        }
        Ok(())
    }
}
