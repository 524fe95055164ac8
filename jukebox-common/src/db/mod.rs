//! Database access layer
//!
//! Connection initialization, schema creation, and shared data models.

pub mod init;
pub mod models;

pub use init::{apply_schema, ensure_party_state, init_database};
