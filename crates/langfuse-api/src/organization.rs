//! Organization-scoped client: projects and project API keys.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};
use crate::models::{
    ApiKeyList, DeleteResponse, Metadata, Project, ProjectApiKey, ProjectList, ProjectRequest,
    find_by_id,
};
use crate::transport::{build_request, build_url, execute};

/// Operations authenticated with an organization API key pair.
#[async_trait]
pub trait OrganizationClient: Send + Sync {
    /// Projects visible to the organization key. `retention_days` is never
    /// populated by this endpoint.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Lists all projects and scans for `project_id`; see [`Self::list_projects`]
    /// for the retention caveat.
    async fn find_project(&self, project_id: &str) -> Result<Project>;

    async fn create_project(
        &self,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project>;

    async fn update_project(
        &self,
        project_id: &str,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project>;

    async fn delete_project(&self, project_id: &str) -> Result<()>;

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ProjectApiKey>>;

    /// Lists every key of the project and scans for `key_id`.
    async fn find_project_api_key(&self, project_id: &str, key_id: &str) -> Result<ProjectApiKey>;

    async fn create_project_api_key(&self, project_id: &str) -> Result<ProjectApiKey>;

    async fn delete_project_api_key(&self, project_id: &str, key_id: &str) -> Result<()>;
}

/// [`OrganizationClient`] over HTTP, authenticated with basic auth.
#[derive(Clone)]
pub struct HttpOrganizationClient {
    http: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl HttpOrganizationClient {
    pub fn new(
        http: reqwest::Client,
        host: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            host: host.into(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
        }
    }

    async fn call<T, B>(&self, method: Method, api_path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = build_url(&self.host, api_path);
        let req = build_request(&self.http, method.clone(), &url, body)?
            .basic_auth(&self.public_key, Some(&self.secret_key));
        execute(req, &method, api_path).await
    }

    async fn get<T: DeserializeOwned>(&self, api_path: &str) -> Result<T> {
        self.call::<T, ()>(Method::GET, api_path, None).await
    }

    async fn delete(&self, api_path: &str) -> Result<DeleteResponse> {
        self.call::<_, ()>(Method::DELETE, api_path, None).await
    }
}

#[async_trait]
impl OrganizationClient for HttpOrganizationClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let list: ProjectList = self.get("api/public/organizations/projects").await?;
        Ok(list.projects)
    }

    async fn find_project(&self, project_id: &str) -> Result<Project> {
        let projects = self.list_projects().await?;
        find_by_id(projects, project_id, |p| p.id.as_str()).ok_or_else(|| {
            ApiError::not_found(format!("project with ID {project_id}"), "organization")
        })
    }

    async fn create_project(
        &self,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project> {
        let body = ProjectRequest {
            name,
            retention: retention_days,
            metadata,
        };
        self.call(Method::POST, "api/public/projects", Some(&body))
            .await
    }

    async fn update_project(
        &self,
        project_id: &str,
        name: &str,
        retention_days: i32,
        metadata: Option<&Metadata>,
    ) -> Result<Project> {
        let body = ProjectRequest {
            name,
            retention: retention_days,
            metadata,
        };
        self.call(
            Method::PUT,
            &format!("api/public/projects/{project_id}"),
            Some(&body),
        )
        .await
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let resp = self
            .delete(&format!("api/public/projects/{project_id}"))
            .await?;
        if !resp.success {
            return Err(ApiError::delete_failed(
                format!("project with ID {project_id}"),
                resp.message,
            ));
        }
        Ok(())
    }

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ProjectApiKey>> {
        let list: ApiKeyList<ProjectApiKey> = self
            .get(&format!("api/public/projects/{project_id}/apiKeys"))
            .await?;
        Ok(list.api_keys)
    }

    async fn find_project_api_key(&self, project_id: &str, key_id: &str) -> Result<ProjectApiKey> {
        let not_found = || {
            ApiError::not_found(
                format!("API key with ID {key_id}"),
                format!("project {project_id}"),
            )
        };
        let keys = match self.list_project_api_keys(project_id).await {
            Err(ApiError::Http { status: 404, .. }) => return Err(not_found()),
            other => other?,
        };
        find_by_id(keys, key_id, |k| k.id.as_str()).ok_or_else(not_found)
    }

    async fn create_project_api_key(&self, project_id: &str) -> Result<ProjectApiKey> {
        self.call::<_, ()>(
            Method::POST,
            &format!("api/public/projects/{project_id}/apiKeys"),
            None,
        )
        .await
    }

    async fn delete_project_api_key(&self, project_id: &str, key_id: &str) -> Result<()> {
        let resp = self
            .delete(&format!("api/public/projects/{project_id}/apiKeys/{key_id}"))
            .await?;
        if !resp.success {
            return Err(ApiError::delete_failed(
                format!("API key with ID {key_id} in project {project_id}"),
                resp.message,
            ));
        }
        Ok(())
    }
}
