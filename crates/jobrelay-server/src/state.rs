use std::sync::Arc;

use jobrelay_core::auth::ProviderRegistry;
use jobrelay_core::clients::{ComputeClient, LogClient};
use jobrelay_core::saga::JobSaga;
use jobrelay_core::store::SqliteStore;

/// Shared application state passed to all route handlers.
///
/// Everything here is built once at startup and read-only afterwards; the
/// store itself opens a fresh connection per operation, so cloning the state
/// across handler invocations shares no live resources.
#[derive(Clone)]
pub struct AppState {
    pub saga: Arc<JobSaga<SqliteStore>>,
    pub logs: Arc<LogClient>,
    pub compute: Arc<ComputeClient>,
    pub registry: Arc<ProviderRegistry>,
}

impl AppState {
    pub fn new(
        store: SqliteStore,
        log_urls: Vec<String>,
        compute_urls: Vec<String>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            saga: Arc::new(JobSaga::new(store)),
            logs: Arc::new(LogClient::new(log_urls)),
            compute: Arc::new(ComputeClient::new(compute_urls)),
            registry: Arc::new(registry),
        }
    }
}
