//! Wire shapes of the Langfuse management API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String-keyed metadata attached to organizations and projects.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// An organization-level API key.
///
/// `public_key` and `secret_key` are only populated in the creation response;
/// listings return the id (and at most a display form of the public key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationApiKey {
    pub id: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Always 0 when the project comes from the listing endpoint.
    #[serde(default)]
    pub retention_days: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A project-level API key. Secrets follow the same rules as [`OrganizationApiKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectApiKey {
    pub id: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRequest<'a> {
    pub name: &'a str,
    pub retention: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Metadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationList {
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiKeyList<K> {
    #[serde(default = "Vec::new")]
    pub api_keys: Vec<K>,
}

/// Body of every delete endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Linear scan over a fetched collection. O(n) per call; the API offers no
/// get-by-id endpoint for projects or API keys.
pub(crate) fn find_by_id<T>(items: Vec<T>, id: &str, key: impl Fn(&T) -> &str) -> Option<T> {
    items.into_iter().find(|item| key(item) == id)
}
