//! Queue database access
//!
//! The queue is append-only: entries are inserted by admission and only
//! ever have their completion flag toggled afterwards. Ordering is always
//! by play_order, never by timestamp.

use crate::error::{Error, Result};
use jukebox_common::db::models::{QueueEntry, RequestSource};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Insert a freshly admitted entry
pub async fn insert_entry(conn: &mut SqliteConnection, entry: &QueueEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO queue
            (entry_id, title, artist, album_art_url, requested_by, source,
             play_order, is_completed, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(&entry.title)
    .bind(&entry.artist)
    .bind(&entry.album_art_url)
    .bind(&entry.requested_by)
    .bind(entry.source.to_db_string())
    .bind(entry.play_order)
    .bind(entry.is_completed)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Full queue in playback order
pub async fn list_all(db: &SqlitePool) -> Result<Vec<QueueEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT entry_id, title, artist, album_art_url, requested_by, source,
               play_order, is_completed, created_at
        FROM queue
        ORDER BY play_order
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Sequence key of an entry, or None if the id is unknown
pub async fn play_order_of(conn: &mut SqliteConnection, entry_id: Uuid) -> Result<Option<i64>> {
    let order: Option<i64> = sqlx::query_scalar("SELECT play_order FROM queue WHERE entry_id = ?")
        .bind(entry_id.to_string())
        .fetch_optional(conn)
        .await?;

    Ok(order)
}

/// Flip an entry's completion flag
pub async fn set_completed(
    conn: &mut SqliteConnection,
    entry_id: Uuid,
    completed: bool,
) -> Result<()> {
    let result = sqlx::query("UPDATE queue SET is_completed = ? WHERE entry_id = ?")
        .bind(completed)
        .bind(entry_id.to_string())
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("queue entry {}", entry_id)));
    }

    Ok(())
}

/// The completed entry with the greatest sequence key at or below `order`
///
/// This is the rewind target: with the position pointer always resting on
/// a completed entry, the lookup resolves to the entry at the pointer.
pub async fn latest_completed_at_or_before(
    conn: &mut SqliteConnection,
    order: i64,
) -> Result<Option<QueueEntry>> {
    let row = sqlx::query(
        r#"
        SELECT entry_id, title, artist, album_art_url, requested_by, source,
               play_order, is_completed, created_at
        FROM queue
        WHERE is_completed = 1 AND play_order <= ?
        ORDER BY play_order DESC
        LIMIT 1
        "#,
    )
    .bind(order)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(entry_from_row).transpose()
}

/// Sequence key of the completed entry closest below `order`, if any
pub async fn latest_completed_below(
    conn: &mut SqliteConnection,
    order: i64,
) -> Result<Option<i64>> {
    let prev: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT play_order
        FROM queue
        WHERE is_completed = 1 AND play_order < ?
        ORDER BY play_order DESC
        LIMIT 1
        "#,
    )
    .bind(order)
    .fetch_optional(conn)
    .await?;

    Ok(prev)
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<QueueEntry> {
    let id_str: String = row.get("entry_id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Invalid UUID in queue.entry_id: {}", e)))?;

    let source_str: String = row.get("source");
    let source = RequestSource::from_str(&source_str)
        .ok_or_else(|| Error::Internal(format!("Invalid queue source: {}", source_str)))?;

    Ok(QueueEntry {
        id,
        title: row.get("title"),
        artist: row.get("artist"),
        album_art_url: row.get("album_art_url"),
        requested_by: row.get("requested_by"),
        source,
        play_order: row.get("play_order"),
        is_completed: row.get("is_completed"),
        created_at: row.get("created_at"),
    })
}
