//! Processed payment event ledger access
//!
//! Reads for the idempotency ledger. Writes happen inside the payment
//! admission transaction and stay there.

use crate::error::Result;
use jukebox_common::db::models::ProcessedPaymentEvent;
use sqlx::{Row, SqlitePool};

/// Look up the ledger record for a provider event id
pub async fn get(db: &SqlitePool, event_id: &str) -> Result<Option<ProcessedPaymentEvent>> {
    let row = sqlx::query(
        r#"
        SELECT event_id, song_id, requested_by, processed_at
        FROM processed_payment_events
        WHERE event_id = ?
        "#,
    )
    .bind(event_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|row| ProcessedPaymentEvent {
        event_id: row.get("event_id"),
        song_id: row.get("song_id"),
        requested_by: row.get("requested_by"),
        processed_at: row.get("processed_at"),
    }))
}
