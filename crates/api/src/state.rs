use std::sync::Arc;

use pluto_core::workflow::{AssessmentEngine, IdentityDirectory};

use crate::analysis::AnalysisClient;
use crate::config::ServerConfig;
use crate::storage::BlobStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// The Assessment Workflow Engine.
    pub engine: Arc<AssessmentEngine>,
    /// Where uploaded drawings are stored.
    pub blobs: Arc<dyn BlobStore>,
    /// Analysis Service client, when one is configured.
    pub analysis: Option<Arc<AnalysisClient>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, for health reporting. `None` when running over
    /// in-memory seams.
    pub pool: Option<pluto_db::DbPool>,
}

impl AppState {
    pub fn directory(&self) -> &Arc<dyn IdentityDirectory> {
        self.engine.directory()
    }
}
