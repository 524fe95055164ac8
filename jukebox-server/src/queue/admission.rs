//! Admission controller
//!
//! Validates a song request, spends credits where the source demands
//! them, and appends exactly one queue entry, all inside a single
//! transaction. Nothing is observable from a failed admission.

use crate::db;
use crate::error::{Error, Result};
use chrono::Utc;
use jukebox_common::db::models::{QueueEntry, RequestSource};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;
use uuid::Uuid;

/// Requester name recorded when the submitted one is blank
const ANONYMOUS_REQUESTER: &str = "Anonymous";

/// One validated-on-entry admission request
#[derive(Debug, Clone)]
pub struct AdmitRequest {
    pub song_id: String,
    pub requested_by: String,
    pub source: RequestSource,
    pub credit_cost: i64,
}

impl AdmitRequest {
    /// Kiosk admission: gated by the shared physical ticket pool
    pub fn kiosk(song_id: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            requested_by: requested_by.into(),
            source: RequestSource::Kiosk,
            credit_cost: 1,
        }
    }

    /// Web-payment admission: already paid out of band, costs no credit
    pub fn web_payment(song_id: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            requested_by: requested_by.into(),
            source: RequestSource::WebPayment,
            credit_cost: 0,
        }
    }

    /// Emergency admission: bypasses the balance, tagged for audit
    pub fn emergency(song_id: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            requested_by: requested_by.into(),
            source: RequestSource::Emergency,
            credit_cost: 0,
        }
    }
}

/// Admit a request into the queue
///
/// Runs the whole check-spend-snapshot-append sequence as one
/// transaction, retried on write conflicts. On success the committed
/// entry is returned; on any error no store is changed.
pub async fn admit(pool: &SqlitePool, request: &AdmitRequest) -> Result<QueueEntry> {
    let entry = super::with_retry(|| try_admit(pool, request)).await?;

    info!(
        "Admitted '{}' for {} (source: {}, order {})",
        entry.title,
        entry.requested_by,
        entry.source.to_db_string(),
        entry.play_order
    );

    Ok(entry)
}

async fn try_admit(pool: &SqlitePool, request: &AdmitRequest) -> Result<QueueEntry> {
    let mut tx = pool.begin().await?;
    let entry = admit_in_tx(&mut tx, request).await?;
    tx.commit().await?;
    Ok(entry)
}

/// The admission steps, composable into a larger transaction
///
/// The payment callback runs these inside its own transaction so the
/// idempotency record and the queue entry commit together.
pub(crate) async fn admit_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    request: &AdmitRequest,
) -> Result<QueueEntry> {
    if request.credit_cost > 0 {
        let spent = db::party::try_spend_credits(&mut *tx, request.credit_cost).await?;
        if !spent {
            return Err(Error::InsufficientCredits);
        }
    }

    // Snapshot the song from the same transaction snapshot; later catalog
    // edits must not reach this entry.
    let song = db::library::get_song(&mut *tx, &request.song_id)
        .await?
        .ok_or_else(|| Error::UnknownSong(request.song_id.clone()))?;

    let play_order = db::party::next_play_order(&mut *tx).await?;

    let requested_by = match request.requested_by.trim() {
        "" => ANONYMOUS_REQUESTER.to_string(),
        name => name.to_string(),
    };

    let entry = QueueEntry {
        id: Uuid::new_v4(),
        title: song.title,
        artist: song.artist,
        album_art_url: song.album_art_url,
        requested_by,
        source: request.source,
        play_order,
        is_completed: false,
        created_at: Utc::now(),
    };

    db::queue::insert_entry(&mut *tx, &entry).await?;

    Ok(entry)
}
