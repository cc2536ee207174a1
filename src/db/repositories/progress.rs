use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{clamp_progress, format_datetime, parse_datetime},
    models::ReadingProgress,
};

/// Only the most recently read articles are remembered.
pub const MAX_TRACKED_SLUGS: usize = 20;

fn row_to_progress(row: &Row) -> Result<ReadingProgress> {
    let last_read: String = row.get("last_read")?;

    Ok(ReadingProgress {
        slug: row.get("slug")?,
        progress: row.get("progress")?,
        last_read: parse_datetime(&last_read, "last_read")?,
    })
}

impl Database {
    /// Upsert progress for `slug` and forget all but the newest entries.
    pub async fn save_progress(
        &self,
        slug: &str,
        progress: f64,
        read_at: DateTime<Utc>,
    ) -> Result<ReadingProgress> {
        let record = ReadingProgress {
            slug: slug.to_string(),
            progress: clamp_progress(progress),
            last_read: read_at,
        };
        let stored = record.clone();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO reading_progress (slug, progress, last_read)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(slug) DO UPDATE SET
                     progress = excluded.progress,
                     last_read = excluded.last_read",
                params![
                    record.slug,
                    record.progress,
                    format_datetime(&record.last_read)
                ],
            )
            .context("failed to upsert reading progress")?;

            tx.execute(
                "DELETE FROM reading_progress
                 WHERE slug NOT IN (
                     SELECT slug FROM reading_progress
                     ORDER BY last_read DESC, slug ASC
                     LIMIT ?1
                 )",
                params![MAX_TRACKED_SLUGS as i64],
            )
            .context("failed to prune reading progress")?;

            tx.commit()?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    pub async fn get_progress(&self, slug: &str) -> Result<Option<ReadingProgress>> {
        let slug = slug.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT slug, progress, last_read FROM reading_progress WHERE slug = ?1",
            )?;

            let result = stmt
                .query_row(params![slug], |row| Ok(row_to_progress(row)))
                .optional()?;

            result.transpose()
        })
        .await
    }

    /// Most recently read first.
    pub async fn list_recent_progress(&self, limit: usize) -> Result<Vec<ReadingProgress>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT slug, progress, last_read FROM reading_progress
                 ORDER BY last_read DESC, slug ASC
                 LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit as i64], |row| Ok(row_to_progress(row)))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row??);
            }
            Ok(entries)
        })
        .await
    }

    pub async fn delete_progress(&self, slug: &str) -> Result<bool> {
        let slug = slug.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM reading_progress WHERE slug = ?1",
                params![slug],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("progress.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn saves_and_updates_progress() {
        let (_dir, db) = open();
        let now = Utc::now();

        assert!(db.get_progress("intro").await.unwrap().is_none());
        db.save_progress("intro", 0.25, now).await.unwrap();
        db.save_progress("intro", 0.75, now + Duration::seconds(5))
            .await
            .unwrap();

        let stored = db.get_progress("intro").await.unwrap().unwrap();
        assert_eq!(stored.progress, 0.75);
        assert_eq!(stored.slug, "intro");
        assert_eq!(db.list_recent_progress(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clamps_out_of_range_progress() {
        let (_dir, db) = open();
        let saved = db.save_progress("post", 3.0, Utc::now()).await.unwrap();
        assert_eq!(saved.progress, 1.0);
        assert_eq!(db.get_progress("post").await.unwrap().unwrap().progress, 1.0);
    }

    #[tokio::test]
    async fn keeps_only_the_most_recent_slugs() {
        let (_dir, db) = open();
        let start = Utc::now();

        for i in 0..(MAX_TRACKED_SLUGS + 5) {
            db.save_progress(&format!("post-{i}"), 0.5, start + Duration::seconds(i as i64))
                .await
                .unwrap();
        }

        let recent = db.list_recent_progress(100).await.unwrap();
        assert_eq!(recent.len(), MAX_TRACKED_SLUGS);
        assert_eq!(recent[0].slug, format!("post-{}", MAX_TRACKED_SLUGS + 4));
        assert!(db.get_progress("post-0").await.unwrap().is_none());
        assert!(db.get_progress("post-5").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deletes_progress() {
        let (_dir, db) = open();
        db.save_progress("post", 0.1, Utc::now()).await.unwrap();
        assert!(db.delete_progress("post").await.unwrap());
        assert!(!db.delete_progress("post").await.unwrap());
    }
}
