//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently. Safe to call on every startup. Party bootstrap is a
//! separate step so the seeder can prepare the library without deciding
//! the party's starting balance.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while one admission commits
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Keep lock waits short; contention is handled by the bounded retry
    // loop around write transactions, not by long blocking waits.
    sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
///
/// Exposed separately so tests can run it against in-memory pools.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    create_library_table(pool).await?;
    create_party_state_table(pool).await?;
    create_queue_table(pool).await?;
    create_processed_payment_events_table(pool).await?;
    Ok(())
}

/// Create the library table
///
/// The read-only song catalog, keyed by the deterministic artist+title
/// slug. Populated by the seeder.
pub async fn create_library_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS library (
            song_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album_art_url TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_library_artist ON library(artist)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the party_state table
///
/// Singleton row (id = 1). The CHECK on credits enforces the balance
/// invariant at the store: no committed transaction can leave it negative.
/// `last_play_order` is the sequence-key counter; `current_play_order` is
/// the playback-position pointer.
pub async fn create_party_state_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS party_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            last_play_order INTEGER NOT NULL DEFAULT 0,
            current_play_order INTEGER,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the queue table
///
/// Append-only; entries are never deleted so history and rewind remain
/// reconstructable. The UNIQUE index on play_order backstops sequence-key
/// uniqueness if two admissions ever race past the counter.
pub async fn create_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue (
            entry_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album_art_url TEXT NOT NULL DEFAULT '',
            requested_by TEXT NOT NULL,
            source TEXT NOT NULL CHECK (source IN ('kiosk', 'web-payment', 'emergency')),
            play_order INTEGER NOT NULL UNIQUE,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_play_order ON queue(play_order)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_completed ON queue(is_completed, play_order)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the processed_payment_events table
///
/// Idempotency ledger for payment callbacks, keyed by the provider's
/// event id.
pub async fn create_processed_payment_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed_payment_events (
            event_id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL,
            requested_by TEXT NOT NULL,
            processed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the singleton party row on first run
///
/// INSERT OR IGNORE handles concurrent initialization: multiple processes
/// may race here and exactly one row survives. An existing party is never
/// reset.
pub async fn ensure_party_state(pool: &SqlitePool, initial_credits: i64) -> Result<()> {
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO party_state (id, credits, is_active)
        VALUES (1, ?, 1)
        "#,
    )
    .bind(initial_credits)
    .execute(pool)
    .await?;

    if inserted.rows_affected() > 0 {
        info!("Created party state with {} initial credits", initial_credits);
    }

    Ok(())
}
