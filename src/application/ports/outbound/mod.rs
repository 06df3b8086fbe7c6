//! Outbound ports - interfaces the application requires from external systems

mod snapshot_port;

pub use snapshot_port::{PersistenceError, SnapshotStorePort};
