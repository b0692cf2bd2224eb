//! Shared application state

use redb::Database;
use std::sync::Arc;

use crate::auth::AuthGate;
use crate::config::Config;
use crate::database::QrStore;
use crate::registry::ShortLinkRegistry;
use crate::render::{QrRenderer, Renderer};
use crate::resolver::PayloadResolver;

/// Application state shared across all request handlers
///
/// Built once at startup from the configuration and the opened database.
/// Every component receives what it needs here instead of reading globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<PayloadResolver>,
    pub registry: Arc<ShortLinkRegistry>,
    pub renderer: Arc<dyn Renderer>,
    pub auth: Arc<AuthGate>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        Self::with_renderer(config, db, Arc::new(QrRenderer))
    }

    pub fn with_renderer(config: Config, db: Database, renderer: Arc<dyn Renderer>) -> Self {
        let store = QrStore::new(Arc::new(db));
        let resolver = PayloadResolver::new(config.upload_dir.clone(), config.base_url.clone());
        let registry = ShortLinkRegistry::new(store, renderer.clone(), config.base_url.clone());
        let auth = AuthGate::new(&config.jwt_secret);

        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            registry: Arc::new(registry),
            renderer,
            auth: Arc::new(auth),
        }
    }
}
