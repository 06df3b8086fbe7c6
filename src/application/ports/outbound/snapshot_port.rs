use async_trait::async_trait;

use crate::domain::aggregates::Document;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage for the session document.
///
/// The engine is the single writer; the store only ever sees whole
/// documents. Combat state is deliberately not part of the contract.
#[async_trait]
pub trait SnapshotStorePort: Send + Sync {
    async fn load(&self) -> Result<Document, PersistenceError>;
    async fn save(&self, document: &Document) -> Result<(), PersistenceError>;
}
