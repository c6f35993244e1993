use std::sync::Arc;

use crate::ledger::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable profile store. Default: PgProfileStore. Swap via STORE_BACKEND env.
    pub store: Arc<dyn ProfileStore>,
}
