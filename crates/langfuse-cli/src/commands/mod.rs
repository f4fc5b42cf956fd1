pub mod plan;
pub mod state;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use langfuse_api::HttpClientFactory;
use langfuse_provider::{Document, Engine, Provider, StateStore, requires_admin_scope};

use crate::config::Settings;

pub(crate) fn load_document(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("Failed to load document {}", path.display()))
}

pub(crate) fn load_state(settings: &Settings) -> Result<StateStore> {
    StateStore::load(&settings.state.path).context("Failed to load state")
}

/// Build an engine over the configured state, checking that the credentials
/// needed for `document` and the recorded resources are present.
pub(crate) fn engine(settings: &Settings, document: Option<&Document>) -> Result<Engine> {
    let state = load_state(settings)?;
    let host = settings.host()?;

    let admin_key = if requires_admin_scope(document, &state) {
        settings.admin_key()?.to_string()
    } else {
        settings.api.admin_key.clone().unwrap_or_default()
    };

    let factory = HttpClientFactory::new(host, admin_key, settings.request_timeout())
        .context("Failed to build HTTP client")?;
    tracing::debug!(host = factory.host(), state = %state.path().display(), "engine ready");

    Ok(Engine::new(Provider::new(Arc::new(factory)), state))
}
