//! Library (catalog) database access
//!
//! The library is read-only from the server's perspective; the seeder
//! owns all writes.

use crate::error::Result;
use jukebox_common::db::models::Song;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// List the full catalog, ordered for stable picker display
pub async fn list_songs(db: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(
        r#"
        SELECT song_id, title, artist, album_art_url, category
        FROM library
        ORDER BY artist, title
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// Look up one song by id
///
/// Takes a connection so admission can resolve the song inside its own
/// transaction snapshot.
pub async fn get_song(conn: &mut SqliteConnection, song_id: &str) -> Result<Option<Song>> {
    let row = sqlx::query(
        r#"
        SELECT song_id, title, artist, album_art_url, category
        FROM library
        WHERE song_id = ?
        "#,
    )
    .bind(song_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.as_ref().map(song_from_row))
}

fn song_from_row(row: &sqlx::sqlite::SqliteRow) -> Song {
    Song {
        id: row.get("song_id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album_art_url: row.get("album_art_url"),
        category: row.get("category"),
    }
}
