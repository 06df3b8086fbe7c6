//! Data transfer objects - the wire boundary
//!
//! DTOs live in the application layer so infrastructure (WebSocket) can
//! serialize and deserialize without knowing about request dispatch.

pub mod protocol;

pub use protocol::{ClientRequest, PatchOp, PatchVerb, ServerResponse};
