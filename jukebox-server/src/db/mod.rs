//! Database access layer
//!
//! Provides database queries for the library, party state, and queue.
//! Functions taking `&mut SqliteConnection` are meant to run inside a
//! caller-owned transaction; pool-taking functions are standalone reads.

pub mod library;
pub mod party;
pub mod payment_events;
pub mod queue;
