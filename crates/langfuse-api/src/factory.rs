use std::sync::Arc;
use std::time::Duration;

use crate::admin::{AdminClient, HttpAdminClient};
use crate::error::Result;
use crate::organization::{HttpOrganizationClient, OrganizationClient};

/// Builds scoped clients from the credential in hand.
///
/// The admin client depends only on process-level settings. Organization
/// clients are built per call from whichever key pair the caller holds.
pub trait ClientFactory: Send + Sync {
    fn admin_client(&self) -> Arc<dyn AdminClient>;

    fn organization_client(&self, public_key: &str, secret_key: &str)
    -> Arc<dyn OrganizationClient>;
}

/// [`ClientFactory`] producing HTTP clients that share one connection pool.
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    host: String,
    admin_api_key: String,
}

impl HttpClientFactory {
    pub fn new(
        host: impl Into<String>,
        admin_api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("langfuse-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(http, host, admin_api_key))
    }

    pub fn with_http_client(
        http: reqwest::Client,
        host: impl Into<String>,
        admin_api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            host: host.into(),
            admin_api_key: admin_api_key.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl ClientFactory for HttpClientFactory {
    fn admin_client(&self) -> Arc<dyn AdminClient> {
        Arc::new(HttpAdminClient::new(
            self.http.clone(),
            self.host.clone(),
            self.admin_api_key.clone(),
        ))
    }

    fn organization_client(
        &self,
        public_key: &str,
        secret_key: &str,
    ) -> Arc<dyn OrganizationClient> {
        Arc::new(HttpOrganizationClient::new(
            self.http.clone(),
            self.host.clone(),
            public_key,
            secret_key,
        ))
    }
}
