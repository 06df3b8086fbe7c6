//! Application configuration

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::services::ReactionPolicy;

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WebSocket server port
    pub server_port: u16,
    /// Where the session document is persisted
    pub state_path: PathBuf,
    /// Seconds between periodic snapshots
    pub snapshot_interval_secs: u64,
    /// Who may answer a contested action
    pub reaction_policy: ReactionPolicy,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            state_path: env::var("STATE_PATH")
                .unwrap_or_else(|_| "campaign_state.json".to_string())
                .into(),
            snapshot_interval_secs: env::var("SNAPSHOT_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("SNAPSHOT_INTERVAL_SECS must be a number of seconds")?,
            reaction_policy: env::var("REACTION_POLICY")
                .unwrap_or_else(|_| "victim_only".to_string())
                .parse()
                .map_err(anyhow::Error::msg)
                .context("REACTION_POLICY must be victim_only or any_opponent")?,
        })
    }
}
