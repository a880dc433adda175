use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::infra::datamall::DatamallClient;
use crate::infra::supabase::{GoTrueClient, PostgrestStore};
use crate::services::{IdentityProvider, Store, TransitSource};

/// Collaborators shared by every handler.
///
/// Built once at startup and never mutated; cloning only bumps reference
/// counts.
#[derive(Clone)]
pub struct AppState {
    pub transit: Arc<dyn TransitSource>,
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        transit: impl TransitSource + 'static,
        store: impl Store + 'static,
        identity: impl IdentityProvider + 'static,
    ) -> Self {
        Self {
            transit: Arc::new(transit),
            store: Arc::new(store),
            identity: Arc::new(identity),
        }
    }

    /// Wires up the real providers.
    pub fn from_config(config: &Config) -> Result<Self> {
        info!(
            datamall = %config.datamall.base_url,
            supabase = %config.supabase.url,
            "Initializing clients"
        );

        Ok(Self::new(
            DatamallClient::from_config(&config.datamall)?,
            PostgrestStore::from_config(&config.supabase)?,
            GoTrueClient::from_config(&config.supabase)?,
        ))
    }
}
