use std::sync::Arc;
use treegrant_core::{Config, DocumentProvider, ListingService, LocalTreeProvider};

pub type SharedState = Arc<AppState>;

/// Per-process state. Listing calls share nothing mutable; the provider
/// owns the grant store.
pub struct AppState {
    pub listing: ListingService,
    pub authorities: Vec<String>,
}

impl AppState {
    pub fn new(provider: Arc<dyn DocumentProvider>, authorities: Vec<String>) -> Self {
        Self {
            listing: ListingService::new(provider),
            authorities,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let provider = LocalTreeProvider::from_config(config);
        let authorities = provider.authorities().map(str::to_string).collect();
        Self::new(Arc::new(provider), authorities)
    }
}
