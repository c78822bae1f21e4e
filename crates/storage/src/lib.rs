use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::{
    domain::{NewPost, Post, PostField, PostId, PostPatch, SortOrder},
    protocol::PostPage,
};

const POST_COLUMNS: &str = "id, title, author, body, last_updated";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Resolved list parameters. Defaults are applied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: PostField,
    pub order: SortOrder,
    pub search: String,
}

impl PostQuery {
    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database opens a fresh, empty one.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_posts_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_posts_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                title        TEXT NOT NULL,
                author       TEXT NOT NULL,
                body         TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                search_text  TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure posts table exists")?;
        self.ensure_search_text_column().await
    }

    // Databases created before `search_text` existed get the column added
    // and filled in once.
    async fn ensure_search_text_column(&self) -> Result<()> {
        let present: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('posts') WHERE name = 'search_text'",
        )
        .fetch_one(&self.pool)
        .await
        .context("failed to inspect posts table")?;
        if present > 0 {
            return Ok(());
        }

        sqlx::query("ALTER TABLE posts ADD COLUMN search_text TEXT NOT NULL DEFAULT ''")
            .execute(&self.pool)
            .await
            .context("failed to add posts.search_text")?;
        let rows = sqlx::query("SELECT id, title, author, body FROM posts")
            .fetch_all(&self.pool)
            .await
            .context("failed to read posts for search backfill")?;
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let title: String = row.try_get("title")?;
            let author: String = row.try_get("author")?;
            let body: String = row.try_get("body")?;
            sqlx::query("UPDATE posts SET search_text = ? WHERE id = ?")
                .bind(search_text(&title, &author, &body))
                .bind(id)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to backfill search text for post {id}"))?;
        }
        debug!(backfilled = rows.len(), "added posts.search_text");
        Ok(())
    }

    pub async fn create_post(&self, post: &NewPost, now: DateTime<Utc>) -> Result<Post> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (title, author, body, last_updated, search_text)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.body)
        .bind(encode_timestamp(now))
        .bind(search_text(&post.title, &post.author, &post.body))
        .fetch_one(&self.pool)
        .await
        .context("failed to insert post")?;
        post_from_row(&row)
    }

    pub async fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(post_id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load post {post_id}"))?;
        row.as_ref().map(post_from_row).transpose()
    }

    /// Applies the present fields of `patch` and restamps the post.
    /// Returns `None` when no post has `post_id`.
    pub async fn update_post(
        &self,
        post_id: PostId,
        patch: &PostPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await.context("failed to begin update")?;
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
            .bind(post_id.0)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("failed to load post {post_id} for update"))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut post = post_from_row(&row)?;
        if let Some(title) = &patch.title {
            post.title = title.clone();
        }
        if let Some(author) = &patch.author {
            post.author = author.clone();
        }
        if let Some(body) = &patch.body {
            post.body = body.clone();
        }
        let row = sqlx::query(&format!(
            "UPDATE posts SET title = ?, author = ?, body = ?, last_updated = ?, search_text = ?
             WHERE id = ?
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.body)
        .bind(encode_timestamp(now))
        .bind(search_text(&post.title, &post.author, &post.body))
        .bind(post_id.0)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to update post {post_id}"))?;
        tx.commit().await.context("failed to commit update")?;
        post_from_row(&row).map(Some)
    }

    /// Returns whether a row was removed.
    pub async fn delete_post(&self, post_id: PostId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete post {post_id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_posts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .context("failed to count posts")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Sorted, filtered, paged listing. `total` counts every match, not
    /// just the returned page.
    pub async fn list_posts(&self, query: &PostQuery) -> Result<PostPage> {
        let search = query.search.trim().to_lowercase();
        let filter = "(?1 = '' OR instr(search_text, ?1) > 0)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM posts WHERE {filter}"))
            .bind(&search)
            .fetch_one(&self.pool)
            .await
            .context("failed to count matching posts")?;

        let direction = sort_direction(query.order);
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE {filter}
             ORDER BY {column} {direction}, id {direction}
             LIMIT ?2 OFFSET ?3",
            column = sort_column(query.sort),
        );
        let rows = sqlx::query(&sql)
            .bind(&search)
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .context("failed to list posts")?;

        let data = rows.iter().map(post_from_row).collect::<Result<Vec<_>>>()?;
        debug!(
            page = query.page,
            limit = query.limit,
            returned = data.len(),
            total,
            "listed posts"
        );
        Ok(PostPage {
            data,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

fn sort_column(field: PostField) -> &'static str {
    match field {
        PostField::Id => "id",
        PostField::Title => "title",
        PostField::Author => "author",
        PostField::Body => "body",
        PostField::LastUpdated => "last_updated",
    }
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

// SQLite's lower() only folds ASCII, so the searchable text is folded here.
// The unit separator keeps a match from spanning two fields.
fn search_text(title: &str, author: &str, body: &str) -> String {
    format!("{title}\u{1f}{author}\u{1f}{body}").to_lowercase()
}

// Fixed-width so that lexical order in SQLite matches chronological order.
fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let raw_timestamp: String = row.try_get("last_updated")?;
    let last_updated = DateTime::parse_from_rfc3339(&raw_timestamp)
        .with_context(|| format!("invalid last_updated value '{raw_timestamp}'"))?
        .with_timezone(&Utc);
    Ok(Post {
        id: PostId(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        body: row.try_get("body")?,
        last_updated,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
