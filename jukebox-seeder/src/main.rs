//! Catalog seeder - one-time library import
//!
//! Reads a JSON repertoire file and upserts every song into the library
//! table under its deterministic artist+title id. Re-running against the
//! same file converges on the same rows, so the repertoire can be
//! corrected and re-imported at any time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox_common::slug;

/// Command-line arguments for jukebox-seeder
#[derive(Parser, Debug)]
#[command(name = "jukebox-seeder")]
#[command(about = "Import a song repertoire into the jukebox library")]
#[command(version)]
struct Args {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "jukebox.db", env = "JUKEBOX_DB")]
    db_path: PathBuf,

    /// JSON repertoire file to import
    #[arg(short, long, default_value = "data/repertoire.json")]
    input: PathBuf,
}

/// One repertoire record as it appears in the import file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepertoireRecord {
    category: String,
    artist: String,
    title: String,
    #[serde(default)]
    album_art_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_seeder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let contents = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read repertoire file {}", args.input.display()))?;
    let records: Vec<RepertoireRecord> =
        serde_json::from_str(&contents).context("Failed to parse repertoire JSON")?;

    info!(
        "Importing {} songs from {}",
        records.len(),
        args.input.display()
    );

    // No credits are seeded here; party bootstrap belongs to the server
    let pool = jukebox_common::db::init_database(&args.db_path)
        .await
        .context("Failed to initialize database")?;

    let count = import_records(&pool, &records).await?;

    info!("Done: {} songs synchronized to the library", count);
    Ok(())
}

/// Upsert all records; returns the number successfully written
async fn import_records(pool: &SqlitePool, records: &[RepertoireRecord]) -> Result<usize> {
    let mut count = 0;

    for record in records {
        let artist = record.artist.trim();
        let title = record.title.trim();
        let song_id = slug::song_id(artist, title);

        let result = sqlx::query(
            r#"
            INSERT INTO library (song_id, title, artist, album_art_url, category)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(song_id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album_art_url = excluded.album_art_url,
                category = excluded.category,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&song_id)
        .bind(title)
        .bind(artist)
        .bind(record.album_art_url.trim())
        .bind(record.category.trim())
        .execute(pool)
        .await;

        match result {
            Ok(_) => {
                count += 1;
                if count % 100 == 0 {
                    info!("Synced {} pieces...", count);
                }
            }
            Err(err) => {
                warn!("Failed to sync song '{}': {}", record.title, err);
            }
        }
    }

    Ok(count)
}
