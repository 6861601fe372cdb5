use std::future::Future;
use std::sync::Arc;

use navette_core::store::ScheduleStore;
use navette_db::PgScheduleStore;
use navette_planning::memory::InMemoryStore;
use navette_planning::service::PlanningService;

use crate::config::ServerConfig;

/// A schedule store the API can serve from.
pub trait StoreBackend: ScheduleStore + 'static {
    /// Whether the backing storage is reachable.
    fn ping(&self) -> impl Future<Output = bool> + Send;
}

impl StoreBackend for PgScheduleStore {
    async fn ping(&self) -> bool {
        navette_db::health_check(self.pool()).await.is_ok()
    }
}

impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> bool {
        true
    }
}

/// Shared application state available to all Axum handlers via
/// `State<AppState<S>>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
pub struct AppState<S> {
    /// Scheduling operations over the configured store.
    pub planning: PlanningService<S>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            planning: self.planning.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
