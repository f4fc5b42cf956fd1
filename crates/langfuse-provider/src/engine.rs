//! Plan, apply, refresh and destroy over the four resource kinds.
//!
//! Resources are processed one at a time in [`ResourceKind::APPLY_ORDER`]
//! (reverse order for deletions). State is saved after every successful
//! mutation, so a failure part way through never loses a created secret.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use langfuse_api::ClientFactory;
use serde::Serialize;
use serde_json::Value;

use crate::address::{Address, ResourceKind};
use crate::document::{Document, Lookup};
use crate::error::EngineError;
use crate::resources::{
    Change, DynResource, OrganizationApiKeyResource, OrganizationResource, ProjectApiKeyResource,
    ProjectResource, check_config,
};
use crate::state::StateStore;

/// One reconciler per kind, wired to a client factory.
pub struct Provider {
    organizations: OrganizationResource,
    organization_api_keys: OrganizationApiKeyResource,
    projects: ProjectResource,
    project_api_keys: ProjectApiKeyResource,
}

impl Provider {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        let admin = clients.admin_client();
        Self {
            organizations: OrganizationResource::new(admin.clone()),
            organization_api_keys: OrganizationApiKeyResource::new(admin),
            projects: ProjectResource::new(clients.clone()),
            project_api_keys: ProjectApiKeyResource::new(clients),
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> &dyn DynResource {
        match kind {
            ResourceKind::Organization => &self.organizations,
            ResourceKind::OrganizationApiKey => &self.organization_api_keys,
            ResourceKind::Project => &self.projects,
            ResourceKind::ProjectApiKey => &self.project_api_keys,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Replace,
    Delete,
    NoChange,
}

impl Action {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
            Self::NoChange => " ",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        })
    }
}

impl From<Change> for Action {
    fn from(change: Change) -> Self {
        match change {
            Change::NoChange => Self::NoChange,
            Change::Update => Self::Update,
            Change::Replace => Self::Replace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub address: Address,
    pub action: Action,
    /// Attributes that are only known after an earlier resource is applied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action.is_change())
    }

    pub fn action_for(&self, address: &Address) -> Option<Action> {
        self.changes
            .iter()
            .find(|c| &c.address == address)
            .map(|c| c.action)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                Action::Create => summary.create += 1,
                Action::Update => summary.update += 1,
                Action::Replace => summary.replace += 1,
                Action::Delete => summary.delete += 1,
                Action::NoChange => {}
            }
        }
        summary
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub unchanged: Vec<Address>,
    pub drifted: Vec<Address>,
    /// Gone from the remote side, dropped from state.
    pub removed: Vec<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: Vec<Address>,
    pub updated: Vec<Address>,
    pub replaced: Vec<Address>,
    pub deleted: Vec<Address>,
    pub unchanged: Vec<Address>,
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} replaced, {} deleted",
            self.created.len(),
            self.updated.len(),
            self.replaced.len(),
            self.deleted.len()
        )
    }
}

/// Decode every declared resource into its kind's configuration, with
/// references standing in as unknown values. No API calls are made.
pub fn validate_document(document: &Document) -> Result<(), EngineError> {
    document.validate()?;
    for address in document.addresses() {
        let resolved = document.resolve(address, |_, _| Lookup::Unknown)?;
        check_config(address.kind, resolved.config)
            .map_err(|e| EngineError::resource(address, e))?;
    }
    Ok(())
}

/// Whether working on `document` and `state` needs the admin API key.
pub fn requires_admin_scope(document: Option<&Document>, state: &StateStore) -> bool {
    let admin_kind = |a: &Address| {
        matches!(
            a.kind,
            ResourceKind::Organization | ResourceKind::OrganizationApiKey
        )
    };
    state.addresses().any(admin_kind)
        || document.is_some_and(|d| d.addresses().any(admin_kind))
}

fn state_lookup(state: &StateStore, target: &Address, attribute: &str) -> Lookup {
    match state.attribute(target, attribute) {
        Some(value) => Lookup::Known(value.clone()),
        None => Lookup::Missing,
    }
}

pub struct Engine {
    provider: Provider,
    state: StateStore,
}

impl Engine {
    pub fn new(provider: Provider, state: StateStore) -> Self {
        Self { provider, state }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn into_state(self) -> StateStore {
        self.state
    }

    /// Read every recorded resource back from the API. Vanished resources are
    /// dropped from state without error.
    pub async fn refresh(&mut self) -> Result<RefreshReport, EngineError> {
        let mut report = RefreshReport::default();

        for kind in ResourceKind::APPLY_ORDER {
            let resource = self.provider.resource(kind);
            for address in self.state.addresses_of(kind) {
                let Some(current) = self.state.attributes(&address).cloned() else {
                    continue;
                };
                let refreshed = resource
                    .read(current.clone())
                    .await
                    .map_err(|e| EngineError::resource(&address, e))?;

                match refreshed {
                    Some(refreshed) if refreshed == current => report.unchanged.push(address),
                    Some(refreshed) => {
                        tracing::info!(%address, "resource drifted");
                        self.state.put_value(&address, refreshed);
                        report.drifted.push(address);
                    }
                    None => {
                        tracing::info!(%address, "resource vanished, dropping from state");
                        self.state.remove(&address);
                        report.removed.push(address);
                    }
                }
            }
        }

        if !report.drifted.is_empty() || !report.removed.is_empty() {
            self.state.save()?;
        }
        Ok(report)
    }

    /// Compare `document` with the recorded state. Makes no API calls; run
    /// [`Engine::refresh`] first for a plan against live data.
    pub fn plan(&self, document: &Document) -> Result<Plan, EngineError> {
        document.validate()?;
        let mut changes = Vec::new();

        for kind in ResourceKind::destroy_order() {
            for address in self.state.addresses_of(kind) {
                if !document.contains(&address) {
                    changes.push(PlannedChange {
                        address,
                        action: Action::Delete,
                        unknown: Vec::new(),
                    });
                }
            }
        }

        // Resources whose attributes only exist after this apply.
        let mut pending: HashSet<Address> = HashSet::new();

        for kind in ResourceKind::APPLY_ORDER {
            let resource = self.provider.resource(kind);
            for address in document.addresses_of(kind) {
                let resolved = document.resolve(address, |target, attribute| {
                    if pending.contains(target) {
                        Lookup::Unknown
                    } else {
                        state_lookup(&self.state, target, attribute)
                    }
                })?;

                let action = match self.state.attributes(address) {
                    None => Action::Create,
                    Some(current) => resource
                        .diff(resolved.config, current.clone())
                        .map_err(|e| EngineError::resource(address, e))?
                        .into(),
                };

                if matches!(action, Action::Create | Action::Replace) {
                    pending.insert(address.clone());
                }
                changes.push(PlannedChange {
                    address: address.clone(),
                    action,
                    unknown: resolved.unknown,
                });
            }
        }

        Ok(Plan { changes })
    }

    /// Converge the remote side and the state onto `document`.
    pub async fn apply(&mut self, document: &Document) -> Result<ApplyReport, EngineError> {
        document.validate()?;
        self.refresh().await?;
        let mut report = ApplyReport::default();

        for kind in ResourceKind::destroy_order() {
            for address in self.state.addresses_of(kind) {
                if !document.contains(&address) {
                    self.delete(&address).await?;
                    report.deleted.push(address);
                }
            }
        }

        for kind in ResourceKind::APPLY_ORDER {
            for address in document.addresses_of(kind) {
                let resolved = document
                    .resolve(address, |target, attribute| {
                        state_lookup(&self.state, target, attribute)
                    })?;
                let config = resolved.config;

                let Some(current) = self.state.attributes(address).cloned() else {
                    self.create(address, config).await?;
                    report.created.push(address.clone());
                    continue;
                };

                let resource = self.provider.resource(kind);
                let change = resource
                    .diff(config.clone(), current.clone())
                    .map_err(|e| EngineError::resource(address, e))?;

                match change {
                    Change::NoChange => report.unchanged.push(address.clone()),
                    Change::Update => {
                        let updated = resource
                            .update(config, current)
                            .await
                            .map_err(|e| EngineError::resource(address, e))?;
                        self.state.put_value(address, updated);
                        self.state.save()?;
                        tracing::info!(%address, "updated");
                        report.updated.push(address.clone());
                    }
                    Change::Replace => {
                        self.delete(address).await?;
                        self.create(address, config).await?;
                        report.replaced.push(address.clone());
                    }
                }
            }
        }

        Ok(report)
    }

    /// Delete every recorded resource, children first.
    pub async fn destroy(&mut self) -> Result<Vec<Address>, EngineError> {
        self.refresh().await?;
        let mut destroyed = Vec::new();

        for kind in ResourceKind::destroy_order() {
            for address in self.state.addresses_of(kind) {
                self.delete(&address).await?;
                destroyed.push(address);
            }
        }

        Ok(destroyed)
    }

    async fn create(&mut self, address: &Address, config: Value) -> Result<(), EngineError> {
        let created = self
            .provider
            .resource(address.kind)
            .create(config)
            .await
            .map_err(|e| EngineError::resource(address, e))?;
        self.state.put_value(address, created);
        self.state.save()?;
        tracing::info!(%address, "created");
        Ok(())
    }

    async fn delete(&mut self, address: &Address) -> Result<(), EngineError> {
        let Some(current) = self.state.attributes(address).cloned() else {
            return Ok(());
        };
        self.provider
            .resource(address.kind)
            .delete(current)
            .await
            .map_err(|e| EngineError::resource(address, e))?;
        self.state.remove(address);
        self.state.save()?;
        tracing::info!(%address, "deleted");
        Ok(())
    }
}
