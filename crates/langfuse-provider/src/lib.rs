//! Desired-state reconciliation of Langfuse organizations, organization API
//! keys, projects and project API keys.
//!
//! - [`resources`]: one reconciler per entity kind (create, read, update, delete)
//! - [`state`]: the JSON state file holding identities and write-once secrets
//! - [`document`]: the TOML desired-state document and its references
//! - [`engine`]: plan, apply, refresh and destroy in dependency order

pub mod address;
pub mod document;
pub mod engine;
pub mod error;
pub mod resources;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{Address, ResourceKind};
pub use document::Document;
pub use engine::{
    Action, ApplyReport, Engine, Plan, PlanSummary, PlannedChange, Provider, RefreshReport,
    requires_admin_scope, validate_document,
};
pub use error::{DocumentError, EngineError, ResourceError, StateError};
pub use resources::{Change, DynResource, Resource};
pub use state::{ResourceRecord, StateStore};
