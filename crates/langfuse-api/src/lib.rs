//! Typed clients for the Langfuse management API.
//!
//! Two credential scopes exist and each has its own client:
//!
//! - [`AdminClient`] authenticates with the instance admin key (bearer token)
//!   and manages organizations and their API keys.
//! - [`OrganizationClient`] authenticates with an organization API key pair
//!   (basic auth) and manages projects and their API keys.
//!
//! [`ClientFactory`] hands out both, so callers never build the transport
//! themselves.

pub mod admin;
pub mod error;
pub mod factory;
pub mod models;
pub mod organization;
pub mod transport;

pub use admin::{AdminClient, HttpAdminClient};
pub use error::{ApiError, ErrorCategory, Result};
pub use factory::{ClientFactory, HttpClientFactory};
pub use models::{Metadata, Organization, OrganizationApiKey, Project, ProjectApiKey};
pub use organization::{HttpOrganizationClient, OrganizationClient};
