//! Application services - request orchestration over the domain

pub mod sync;

pub use sync::{EngineError, ReactionPolicy, SyncService};
