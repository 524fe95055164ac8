//! HTTP API layer
//!
//! Router assembly, request handlers, and the admin/kiosk auth checks.

pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{create_router, AppContext};
