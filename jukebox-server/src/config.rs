//! jukebox-server specific configuration

use std::path::PathBuf;

/// Request server configuration
///
/// Secrets arrive via environment variables (with development defaults)
/// so the same binary runs locally and behind a cloud deployment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: String,
    /// Operator password for the admin endpoints
    pub admin_password: String,
    /// Shared secret presented by authorized kiosk devices
    pub kiosk_secret: String,
    /// Shared secret for payment webhook signatures
    pub webhook_secret: String,
    /// Credits seeded into a brand-new party state
    pub initial_credits: i64,
}
