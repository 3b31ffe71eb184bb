// src/store/mod.rs
//! SQLite-backed Post store. Conflict-safe inserts keyed by title, range
//! queries by timestamp, and the batch processed-flag update used by the
//! digest dispatcher.

pub mod schema;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use schema::SCHEMA;

/// A stored, deduplicated channel message that matched the keyword filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub source_channel: Option<String>,
    pub message_id: i64,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

/// Insert payload; `id` and `processed` are store-owned.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub source_channel: Option<String>,
    pub message_id: i64,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PostStore {
    conn: Connection,
}

impl PostStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .await
            .with_context(|| format!("opening sqlite db at {db_path}"))?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .context("applying schema")?;

        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .context("opening in-memory sqlite db")?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .context("applying schema")?;
        Ok(Self { conn })
    }

    /// Insert-or-ignore on title conflict. Returns `true` when a row was
    /// actually written, `false` when a duplicate title won the race.
    pub async fn insert_post(&self, post: NewPost) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let keywords_json =
                    serde_json::to_string(&post.keywords).unwrap_or_else(|_| "[]".to_string());
                let n = conn.execute(
                    r#"INSERT INTO posts (title, content, source_channel, message_id, keywords, created_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(title) DO NOTHING"#,
                    params![
                        post.title,
                        post.content,
                        post.source_channel,
                        post.message_id,
                        keywords_json,
                        post.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(n > 0)
            })
            .await
            .context("insert post")?;
        Ok(inserted)
    }

    /// Dedupe lookup: does a post with this title exist at or after `cutoff`?
    pub async fn title_exists_since(
        &self,
        title: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool> {
        let title = title.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE title = ?1 AND created_at >= ?2",
                    params![title, cutoff.to_rfc3339()],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .context("title lookup")?;
        Ok(exists)
    }

    /// Posts with `created_at >= cutoff`, newest first. With
    /// `unprocessed_only`, rows already swept into a digest are excluded.
    pub async fn fetch_since(
        &self,
        cutoff: DateTime<Utc>,
        unprocessed_only: bool,
    ) -> Result<Vec<Post>> {
        let posts = self
            .conn
            .call(move |conn| {
                let sql = if unprocessed_only {
                    "SELECT id, title, content, source_channel, message_id, keywords, created_at, processed
                     FROM posts WHERE created_at >= ?1 AND processed = 0
                     ORDER BY created_at DESC"
                } else {
                    "SELECT id, title, content, source_channel, message_id, keywords, created_at, processed
                     FROM posts WHERE created_at >= ?1
                     ORDER BY created_at DESC"
                };
                let mut stmt = conn.prepare(sql)?;
                let posts = stmt
                    .query_map(params![cutoff.to_rfc3339()], |row| Ok(post_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await
            .context("fetch posts since cutoff")?;
        Ok(posts)
    }

    /// Flip `processed` for the given ids in one statement.
    pub async fn mark_processed(&self, ids: Vec<i64>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.conn
            .call(move |conn| {
                let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!("UPDATE posts SET processed = 1 WHERE id IN ({placeholders})");
                conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
                Ok(())
            })
            .await
            .context("mark posts processed")?;
        Ok(())
    }
}

fn post_from_row(row: &Row) -> Post {
    let keywords: Vec<String> = row
        .get::<_, String>(5)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    Post {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        content: row.get(2).unwrap(),
        source_channel: row.get(3).unwrap(),
        message_id: row.get(4).unwrap(),
        keywords,
        created_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        processed: row.get::<_, i64>(7).unwrap() != 0,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
