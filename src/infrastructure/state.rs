//! Shared application state

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::ports::outbound::SnapshotStorePort;
use crate::application::services::SyncService;
use crate::domain::aggregates::GameState;
use crate::infrastructure::config::AppConfig;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// The authoritative game state. Requests take the write lock for
    /// their full duration, so each one runs to completion before the
    /// next starts.
    pub game: RwLock<GameState>,
    pub sync: SyncService,
    pub store: Arc<dyn SnapshotStorePort>,
}

impl AppState {
    pub fn new(config: AppConfig, game: GameState, store: Arc<dyn SnapshotStorePort>) -> Self {
        let sync = SyncService::new(config.reaction_policy);
        Self {
            config,
            game: RwLock::new(game),
            sync,
            store,
        }
    }
}
