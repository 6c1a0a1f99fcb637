//! Durable storage for [`RollbackState`](pilot_core::RollbackState).
//!
//! Each session is kept in its own `state-<session_id>.json` file inside a
//! state directory, wrapped in an envelope carrying a schema version and a
//! SHA-256 checksum of the payload. Writers and readers coordinate through
//! advisory locks on a sibling `.state-<session_id>.lock` file, and every
//! write goes through a temporary file followed by an atomic rename.
//! `latest.txt` points at the most recently saved session.

mod error;
mod lock;
mod repository;
mod wrapper;

pub use error::{Result, StoreError};
pub use repository::{JsonStateRepository, StateRepository, StoreConfig};
pub use wrapper::{SCHEMA_VERSION, StateMetadata, StateWrapper};
