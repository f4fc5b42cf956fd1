//! Admin-scoped client: organizations and organization API keys.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};
use crate::models::{
    ApiKeyList, DeleteResponse, Metadata, Organization, OrganizationApiKey, OrganizationList,
    OrganizationRequest, find_by_id,
};
use crate::transport::{build_request, build_url, execute};

/// Operations available with the instance-wide admin API key.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    /// Returns [`ApiError::NotFound`] when the API answers 404.
    async fn get_organization(&self, org_id: &str) -> Result<Organization>;

    async fn create_organization(
        &self,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization>;

    async fn update_organization(
        &self,
        org_id: &str,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization>;

    async fn delete_organization(&self, org_id: &str) -> Result<()>;

    async fn list_organization_api_keys(&self, org_id: &str) -> Result<Vec<OrganizationApiKey>>;

    /// Lists every key of the organization and scans for `key_id`.
    ///
    /// There is no get-by-id endpoint, so this costs one listing per call.
    /// A 404 on the listing means the organization is gone and is reported as
    /// [`ApiError::NotFound`] too.
    async fn find_organization_api_key(
        &self,
        org_id: &str,
        key_id: &str,
    ) -> Result<OrganizationApiKey>;

    async fn create_organization_api_key(&self, org_id: &str) -> Result<OrganizationApiKey>;

    async fn delete_organization_api_key(&self, org_id: &str, key_id: &str) -> Result<()>;
}

/// [`AdminClient`] over HTTP, authenticated with a bearer token.
#[derive(Clone)]
pub struct HttpAdminClient {
    http: reqwest::Client,
    host: String,
    api_key: String,
}

impl HttpAdminClient {
    pub fn new(http: reqwest::Client, host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    async fn call<T, B>(&self, method: Method, api_path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = build_url(&self.host, api_path);
        let req = build_request(&self.http, method.clone(), &url, body)?.bearer_auth(&self.api_key);
        execute(req, &method, api_path).await
    }

    async fn get<T: DeserializeOwned>(&self, api_path: &str) -> Result<T> {
        self.call::<T, ()>(Method::GET, api_path, None).await
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let list: OrganizationList = self.get("api/admin/organizations").await?;
        Ok(list.organizations)
    }

    async fn get_organization(&self, org_id: &str) -> Result<Organization> {
        match self
            .get(&format!("api/admin/organizations/{org_id}"))
            .await
        {
            Err(ApiError::Http { status: 404, .. }) => Err(ApiError::not_found(
                format!("organization {org_id}"),
                "admin scope",
            )),
            other => other,
        }
    }

    async fn create_organization(
        &self,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization> {
        let body = OrganizationRequest { name, metadata };
        self.call(Method::POST, "api/admin/organizations", Some(&body))
            .await
    }

    async fn update_organization(
        &self,
        org_id: &str,
        name: &str,
        metadata: Option<&Metadata>,
    ) -> Result<Organization> {
        let body = OrganizationRequest { name, metadata };
        self.call(
            Method::PUT,
            &format!("api/admin/organizations/{org_id}"),
            Some(&body),
        )
        .await
    }

    async fn delete_organization(&self, org_id: &str) -> Result<()> {
        let resp: DeleteResponse = self
            .call::<_, ()>(
                Method::DELETE,
                &format!("api/admin/organizations/{org_id}"),
                None,
            )
            .await?;
        if !resp.success {
            return Err(ApiError::delete_failed(
                format!("organization with ID {org_id}"),
                resp.message,
            ));
        }
        Ok(())
    }

    async fn list_organization_api_keys(&self, org_id: &str) -> Result<Vec<OrganizationApiKey>> {
        let list: ApiKeyList<OrganizationApiKey> = self
            .get(&format!("api/admin/organizations/{org_id}/apiKeys"))
            .await?;
        Ok(list.api_keys)
    }

    async fn find_organization_api_key(
        &self,
        org_id: &str,
        key_id: &str,
    ) -> Result<OrganizationApiKey> {
        let not_found = || {
            ApiError::not_found(
                format!("API key with ID {key_id}"),
                format!("organization {org_id}"),
            )
        };
        // A vanished organization has no keys either.
        let keys = match self.list_organization_api_keys(org_id).await {
            Err(ApiError::Http { status: 404, .. }) => return Err(not_found()),
            other => other?,
        };
        find_by_id(keys, key_id, |k| k.id.as_str()).ok_or_else(not_found)
    }

    async fn create_organization_api_key(&self, org_id: &str) -> Result<OrganizationApiKey> {
        self.call::<_, ()>(
            Method::POST,
            &format!("api/admin/organizations/{org_id}/apiKeys"),
            None,
        )
        .await
    }

    async fn delete_organization_api_key(&self, org_id: &str, key_id: &str) -> Result<()> {
        let resp: DeleteResponse = self
            .call::<_, ()>(
                Method::DELETE,
                &format!("api/admin/organizations/{org_id}/apiKeys/{key_id}"),
                None,
            )
            .await?;
        if !resp.success {
            return Err(ApiError::delete_failed(
                format!("API key with ID {key_id} in organization {org_id}"),
                resp.message,
            ));
        }
        Ok(())
    }
}
