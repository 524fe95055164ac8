//! Payment callback admission
//!
//! The payment provider delivers confirmations at least once and in no
//! particular order. Each event id is recorded in the same transaction
//! that performs the admission, so a redelivered confirmation finds its
//! record and becomes a no-op instead of a duplicate queue entry.

use crate::db;
use crate::error::{Error, Result};
use crate::queue::admission::{self, AdmitRequest};
use jukebox_common::db::models::QueueEntry;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info};

/// A verified "payment completed" event, after signature checking
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub event_id: String,
    pub song_id: String,
    pub user_name: String,
}

/// What a confirmation delivery resulted in
///
/// Only `Admitted` created a queue entry. `Duplicate` and `UnknownSong`
/// are successful no-ops from the provider's point of view: the charge
/// went through and redelivering cannot change the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Admitted(QueueEntry),
    Duplicate,
    UnknownSong,
}

/// Process one delivery of a payment confirmation
pub async fn on_payment_confirmed(
    pool: &SqlitePool,
    confirmation: &PaymentConfirmation,
) -> Result<PaymentOutcome> {
    let outcome = super::with_retry(|| try_process(pool, confirmation)).await?;

    match &outcome {
        PaymentOutcome::Admitted(entry) => {
            info!(
                "Payment {} admitted '{}' for {} (order {})",
                confirmation.event_id, entry.title, entry.requested_by, entry.play_order
            );
        }
        PaymentOutcome::Duplicate => {
            info!(
                "Payment event {} already processed, ignoring redelivery",
                confirmation.event_id
            );
        }
        PaymentOutcome::UnknownSong => {
            error!(
                "Payment {} references unknown song '{}' for {}; charge kept, no entry queued",
                confirmation.event_id, confirmation.song_id, confirmation.user_name
            );
        }
    }

    Ok(outcome)
}

async fn try_process(
    pool: &SqlitePool,
    confirmation: &PaymentConfirmation,
) -> Result<PaymentOutcome> {
    let mut tx = pool.begin().await?;

    if !record_event(&mut tx, confirmation).await? {
        // Already recorded by an earlier delivery; nothing was written
        tx.rollback().await?;
        return Ok(PaymentOutcome::Duplicate);
    }

    let request = AdmitRequest::web_payment(&confirmation.song_id, &confirmation.user_name);

    match admission::admit_in_tx(&mut tx, &request).await {
        Ok(entry) => {
            tx.commit().await?;
            Ok(PaymentOutcome::Admitted(entry))
        }
        Err(Error::UnknownSong(_)) => {
            // Keep the event record so redeliveries of this bad id are
            // plain duplicates; the charge already succeeded.
            tx.commit().await?;
            Ok(PaymentOutcome::UnknownSong)
        }
        Err(err) => Err(err),
    }
}

/// Record the event id; false means it was already present
async fn record_event(
    tx: &mut Transaction<'_, Sqlite>,
    confirmation: &PaymentConfirmation,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO processed_payment_events (event_id, song_id, requested_by)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&confirmation.event_id)
    .bind(&confirmation.song_id)
    .bind(&confirmation.user_name)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}
