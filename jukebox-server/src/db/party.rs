//! Party state database access
//!
//! All balance and position mutations go through the connection-taking
//! functions so they stay inside the caller's transaction. Reading the
//! balance outside the transaction that spends it would reintroduce the
//! check-then-decrement race.

use crate::error::{Error, Result};
use jukebox_common::db::models::PartyState;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Read the current party state
pub async fn get_party_state(db: &SqlitePool) -> Result<PartyState> {
    let row = sqlx::query(
        r#"
        SELECT credits, is_active, last_play_order, current_play_order
        FROM party_state
        WHERE id = 1
        "#,
    )
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("party state".to_string()))?;

    Ok(PartyState {
        credits: row.get("credits"),
        is_active: row.get("is_active"),
        last_play_order: row.get("last_play_order"),
        current_play_order: row.get("current_play_order"),
    })
}

/// Atomically spend credits if the balance covers the cost
///
/// Returns false (no rows updated, nothing spent) when the balance is
/// short. The guard and the decrement are one statement, so no
/// interleaving can observe a negative balance.
pub async fn try_spend_credits(conn: &mut SqliteConnection, cost: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE party_state
        SET credits = credits - ?1, updated_at = CURRENT_TIMESTAMP
        WHERE id = 1 AND credits >= ?1
        "#,
    )
    .bind(cost)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Add credits to the balance and return the new total
pub async fn add_credits(conn: &mut SqliteConnection, amount: i64) -> Result<i64> {
    sqlx::query(
        r#"
        UPDATE party_state
        SET credits = credits + ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = 1
        "#,
    )
    .bind(amount)
    .execute(&mut *conn)
    .await?;

    let credits: i64 = sqlx::query_scalar("SELECT credits FROM party_state WHERE id = 1")
        .fetch_one(conn)
        .await?;

    Ok(credits)
}

/// Reserve the next sequence key
///
/// Increments the counter row and reads the new value back inside the
/// same transaction, so keys are strictly increasing in commit order no
/// matter how admissions interleave.
pub async fn next_play_order(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query("UPDATE party_state SET last_play_order = last_play_order + 1 WHERE id = 1")
        .execute(&mut *conn)
        .await?;

    let order: i64 = sqlx::query_scalar("SELECT last_play_order FROM party_state WHERE id = 1")
        .fetch_one(conn)
        .await?;

    Ok(order)
}

/// Read the playback-position pointer
pub async fn get_current_play_order(conn: &mut SqliteConnection) -> Result<Option<i64>> {
    let current: Option<i64> =
        sqlx::query_scalar("SELECT current_play_order FROM party_state WHERE id = 1")
            .fetch_one(conn)
            .await?;

    Ok(current)
}

/// Move the playback-position pointer (None = before the first advance)
pub async fn set_current_play_order(
    conn: &mut SqliteConnection,
    play_order: Option<i64>,
) -> Result<()> {
    sqlx::query(
        "UPDATE party_state SET current_play_order = ?, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
    )
    .bind(play_order)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_common::db::{apply_schema, ensure_party_state};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db(credits: i64) -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        ensure_party_state(&pool, credits).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_spend_respects_balance() {
        let pool = setup_test_db(1).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(try_spend_credits(&mut conn, 1).await.unwrap());
        // Balance is now zero; a second spend must be refused
        assert!(!try_spend_credits(&mut conn, 1).await.unwrap());

        drop(conn);
        let state = get_party_state(&pool).await.unwrap();
        assert_eq!(state.credits, 0);
    }

    #[tokio::test]
    async fn test_spend_refuses_partial_cover() {
        let pool = setup_test_db(1).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(!try_spend_credits(&mut conn, 2).await.unwrap());

        drop(conn);
        let state = get_party_state(&pool).await.unwrap();
        assert_eq!(state.credits, 1);
    }

    #[tokio::test]
    async fn test_next_play_order_increments() {
        let pool = setup_test_db(0).await;
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(next_play_order(&mut conn).await.unwrap(), 1);
        assert_eq!(next_play_order(&mut conn).await.unwrap(), 2);
        assert_eq!(next_play_order(&mut conn).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_current_play_order_roundtrip() {
        let pool = setup_test_db(0).await;
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(get_current_play_order(&mut conn).await.unwrap(), None);

        set_current_play_order(&mut conn, Some(7)).await.unwrap();
        assert_eq!(get_current_play_order(&mut conn).await.unwrap(), Some(7));

        set_current_play_order(&mut conn, None).await.unwrap();
        assert_eq!(get_current_play_order(&mut conn).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_credits_returns_new_balance() {
        let pool = setup_test_db(2).await;
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(add_credits(&mut conn, 5).await.unwrap(), 7);
    }
}
