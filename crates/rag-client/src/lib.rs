#![allow(non_snake_case)]

pub mod access;
pub mod api;
pub mod guard;
pub mod metrics;
pub mod storage;

use std::sync::Arc;

pub use access::AccessKey;
pub use api::{ApiClient, BackendConfig, TokenEndpoint};
pub use guard::{Authenticator, SessionGuard, SignedIn};
pub use metrics::{ConsoleMetrics, MetricsError};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use rag_types::ConsoleResult;

/// Wires the guard to the backend's token endpoint, restores any persisted
/// session and returns a client sharing that guard.
pub fn connect(
    config: &BackendConfig,
    storage: Arc<dyn SessionStorage>,
    metrics: ConsoleMetrics,
) -> ConsoleResult<ApiClient> {
    let http = config.http_client()?;
    let baseUrl = config.base_url()?;

    let tokenEndpoint = TokenEndpoint::new(http.clone(), baseUrl.clone());
    let guard = SessionGuard::with_metrics(storage, Arc::new(tokenEndpoint), metrics);
    guard.restore();

    Ok(ApiClient::new(http, baseUrl, guard))
}
