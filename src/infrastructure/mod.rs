//! Infrastructure layer - external adapters and implementations
//!
//! This layer contains:
//! - Persistence: file-backed document snapshots
//! - WebSocket: real-time communication with clients
//! - Config: application configuration
//! - State: shared application state

pub mod config;
pub mod persistence;
pub mod state;
pub mod websocket;
