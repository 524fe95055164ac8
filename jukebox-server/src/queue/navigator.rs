//! Queue navigator
//!
//! Operator-facing playback movement over the queue. Position is an
//! explicit pointer on the party row (`current_play_order`), not an
//! inference from completion flags: several entries may be completed at
//! once, and "most recently completed by clock" stops meaning anything
//! after the first rewind. The pointer always rests on a completed entry
//! (or is NULL before the first advance).

use crate::db;
use crate::error::{Error, Result};
use jukebox_common::db::models::QueueEntry;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Mark an entry played and move the position pointer onto it
pub async fn advance(pool: &SqlitePool, entry_id: Uuid) -> Result<()> {
    super::with_retry(|| try_advance(pool, entry_id)).await?;
    info!("Advanced past queue entry {}", entry_id);
    Ok(())
}

async fn try_advance(pool: &SqlitePool, entry_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    let play_order = db::queue::play_order_of(&mut tx, entry_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("queue entry {}", entry_id)))?;

    db::queue::set_completed(&mut tx, entry_id, true).await?;
    db::party::set_current_play_order(&mut tx, Some(play_order)).await?;

    tx.commit().await?;
    Ok(())
}

/// Step back to the previous song
///
/// Un-completes the entry at the position pointer (the most recently
/// advanced or restored one) and moves the pointer to the closest
/// completed entry below it. Exactly inverts the latest advance, so
/// repeated advance/rewind cycles stay well-defined.
pub async fn rewind(pool: &SqlitePool) -> Result<QueueEntry> {
    let entry = super::with_retry(|| try_rewind(pool)).await?;
    info!(
        "Rewound to '{}' (order {})",
        entry.title, entry.play_order
    );
    Ok(entry)
}

async fn try_rewind(pool: &SqlitePool) -> Result<QueueEntry> {
    let mut tx = pool.begin().await?;

    let current = db::party::get_current_play_order(&mut tx)
        .await?
        .ok_or_else(|| Error::NotFound("no previous songs".to_string()))?;

    let mut target = db::queue::latest_completed_at_or_before(&mut tx, current)
        .await?
        .ok_or_else(|| Error::NotFound("no previous songs".to_string()))?;

    db::queue::set_completed(&mut tx, target.id, false).await?;
    target.is_completed = false;

    let previous = db::queue::latest_completed_below(&mut tx, target.play_order).await?;
    db::party::set_current_play_order(&mut tx, previous).await?;

    tx.commit().await?;
    Ok(target)
}

/// Add credits to the shared balance
///
/// `amount` must be a positive integer; anything else is rejected before
/// the store is touched. Returns the new balance.
pub async fn refill(pool: &SqlitePool, amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }

    let balance = super::with_retry(|| try_refill(pool, amount)).await?;
    info!("Refilled {} credits (balance now {})", amount, balance);
    Ok(balance)
}

async fn try_refill(pool: &SqlitePool, amount: i64) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let balance = db::party::add_credits(&mut tx, amount).await?;
    tx.commit().await?;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::admission::{admit, AdmitRequest};
    use jukebox_common::db::{apply_schema, ensure_party_state};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        ensure_party_state(&pool, 10).await.unwrap();

        sqlx::query(
            "INSERT INTO library (song_id, title, artist, album_art_url, category)
             VALUES ('x', 'Air', 'Bach', '', 'Baroque')",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    async fn enqueue(pool: &SqlitePool, name: &str) -> QueueEntry {
        admit(pool, &AdmitRequest::kiosk("x", name)).await.unwrap()
    }

    #[tokio::test]
    async fn test_advance_marks_completed_and_moves_pointer() {
        let pool = setup_test_db().await;
        let first = enqueue(&pool, "A").await;

        advance(&pool, first.id).await.unwrap();

        let entries = db::queue::list_all(&pool).await.unwrap();
        assert!(entries[0].is_completed);

        let state = db::party::get_party_state(&pool).await.unwrap();
        assert_eq!(state.current_play_order, Some(first.play_order));
    }

    #[tokio::test]
    async fn test_advance_unknown_entry_is_not_found() {
        let pool = setup_test_db().await;
        let result = advance(&pool, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rewind_inverts_advance() {
        let pool = setup_test_db().await;
        let first = enqueue(&pool, "A").await;
        let second = enqueue(&pool, "B").await;

        advance(&pool, first.id).await.unwrap();
        let before = db::party::get_party_state(&pool).await.unwrap();

        advance(&pool, second.id).await.unwrap();
        let restored = rewind(&pool).await.unwrap();

        // The entry just advanced is playable again and the pointer is
        // back where it was before that advance
        assert_eq!(restored.id, second.id);
        assert!(!restored.is_completed);

        let after = db::party::get_party_state(&pool).await.unwrap();
        assert_eq!(after.current_play_order, before.current_play_order);

        let entries = db::queue::list_all(&pool).await.unwrap();
        assert!(entries[0].is_completed);
        assert!(!entries[1].is_completed);
    }

    #[tokio::test]
    async fn test_rewind_walks_all_the_way_back() {
        let pool = setup_test_db().await;
        let a = enqueue(&pool, "A").await;
        let b = enqueue(&pool, "B").await;
        let c = enqueue(&pool, "C").await;

        advance(&pool, a.id).await.unwrap();
        advance(&pool, b.id).await.unwrap();
        advance(&pool, c.id).await.unwrap();

        assert_eq!(rewind(&pool).await.unwrap().id, c.id);
        assert_eq!(rewind(&pool).await.unwrap().id, b.id);
        assert_eq!(rewind(&pool).await.unwrap().id, a.id);

        // Everything is unplayed again; one more rewind has nothing left
        let state = db::party::get_party_state(&pool).await.unwrap();
        assert_eq!(state.current_play_order, None);
        assert!(matches!(
            rewind(&pool).await,
            Err(Error::NotFound(_))
        ));

        let entries = db::queue::list_all(&pool).await.unwrap();
        assert!(entries.iter().all(|e| !e.is_completed));
    }

    #[tokio::test]
    async fn test_rewind_with_no_history_is_not_found() {
        let pool = setup_test_db().await;
        enqueue(&pool, "A").await;

        let result = rewind(&pool).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refill_rejects_non_positive_amounts() {
        let pool = setup_test_db().await;

        assert!(matches!(
            refill(&pool, 0).await,
            Err(Error::InvalidAmount(0))
        ));
        assert!(matches!(
            refill(&pool, -5).await,
            Err(Error::InvalidAmount(-5))
        ));

        let state = db::party::get_party_state(&pool).await.unwrap();
        assert_eq!(state.credits, 10);
    }

    #[tokio::test]
    async fn test_refill_adds_to_balance() {
        let pool = setup_test_db().await;
        assert_eq!(refill(&pool, 15).await.unwrap(), 25);
    }
}
