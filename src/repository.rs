use crate::models::{Article, ArticleChanges, NewArticle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use thiserror::Error;
use tokio::sync::RwLock;

/// StoreError
///
/// Failures surfaced by every `ArticleRepository` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article {0} not found")]
    NotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ArticleRepository
///
/// The persistence contract for articles. Handlers only ever see this trait, so the
/// Postgres store and the in-memory store are interchangeable.
///
/// There is no optimistic concurrency: two updates to the same id race and the last
/// write wins.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// All articles, newest `created_at` first.
    async fn list_all(&self) -> Result<Vec<Article>, StoreError>;
    /// Articles whose category equals `category` exactly, newest first. No pagination.
    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>, StoreError>;
    async fn get(&self, id: i64) -> Result<Article, StoreError>;
    /// Persists a new article and returns it with its assigned id.
    async fn create(&self, new: NewArticle) -> Result<Article, StoreError>;
    async fn update(&self, id: i64, changes: ArticleChanges) -> Result<Article, StoreError>;
    /// Hard delete. Fails with `NotFound` when nothing was removed.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// ArticleRepositoryState
///
/// The concrete type used to share the article store across the application state.
pub type ArticleRepositoryState = Arc<dyn ArticleRepository>;

// --- Postgres ---

const ARTICLE_COLUMNS: &str = "id, title, lead, content, category, summary, image, \
                               created_at, publish_date, status, views";

/// Row shape of the `articles` table. Positions live in `article_positions`.
#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    lead: Option<String>,
    content: String,
    category: String,
    summary: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
    publish_date: DateTime<Utc>,
    status: String,
    views: i64,
}

impl ArticleRow {
    fn into_article(self, positions: Vec<String>) -> Article {
        Article {
            id: self.id,
            title: self.title,
            lead: self.lead,
            content: self.content,
            category: self.category,
            summary: self.summary,
            image: self.image,
            positions,
            created_at: self.created_at,
            publish_date: self.publish_date,
            status: self.status,
            views: self.views,
        }
    }
}

/// PostgresArticleRepository
///
/// `ArticleRepository` backed by PostgreSQL. Article rows and their positions are written
/// in a single transaction.
pub struct PostgresArticleRepository {
    pool: PgPool,
}

impl PostgresArticleRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the positions for a batch of rows and stitches them onto the articles,
    /// keeping the row order.
    async fn attach_positions(&self, rows: Vec<ArticleRow>) -> Result<Vec<Article>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let position_rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT article_id, position FROM article_positions \
             WHERE article_id = ANY($1) ORDER BY article_id, ordinal",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_article: HashMap<i64, Vec<String>> = HashMap::new();
        for (article_id, position) in position_rows {
            by_article.entry(article_id).or_default().push(position);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let positions = by_article.remove(&row.id).unwrap_or_default();
                row.into_article(positions)
            })
            .collect())
    }
}

async fn insert_positions(
    tx: &mut Transaction<'_, Postgres>,
    article_id: i64,
    positions: &[String],
) -> Result<(), sqlx::Error> {
    for (ordinal, position) in positions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO article_positions (article_id, ordinal, position) VALUES ($1, $2, $3)",
        )
        .bind(article_id)
        .bind(ordinal as i32)
        .bind(position)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl ArticleRepository for PostgresArticleRepository {
    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.attach_positions(rows).await
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE category = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        self.attach_positions(rows).await
    }

    async fn get(&self, id: i64) -> Result<Article, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        let mut articles = self.attach_positions(vec![row]).await?;
        articles.pop().ok_or(StoreError::NotFound(id))
    }

    /// create
    ///
    /// Inserts the row (the BIGSERIAL sequence assigns the id, so ids are never reused)
    /// and its positions in one transaction.
    async fn create(&self, new: NewArticle) -> Result<Article, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles \
                 (title, lead, content, category, summary, image, created_at, publish_date, status, views) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&new.lead)
        .bind(&new.content)
        .bind(&new.category)
        .bind(&new.summary)
        .bind(&new.image)
        .bind(new.created_at)
        .bind(new.publish_date)
        .bind(&new.status)
        .bind(new.views)
        .fetch_one(&mut *tx)
        .await?;

        insert_positions(&mut tx, row.id, &new.positions).await?;
        tx.commit().await?;

        Ok(row.into_article(new.positions))
    }

    /// update
    ///
    /// Overwrites the always-replaced columns and uses `COALESCE` so that `image` and
    /// `status` only change when a value was provided. Positions are replaced wholesale.
    async fn update(&self, id: i64, changes: ArticleChanges) -> Result<Article, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles \
             SET title = $2, \
                 lead = $3, \
                 content = $4, \
                 category = $5, \
                 summary = $6, \
                 image = COALESCE($7, image), \
                 status = COALESCE($8, status) \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.lead)
        .bind(&changes.content)
        .bind(&changes.category)
        .bind(&changes.summary)
        .bind(&changes.image)
        .bind(&changes.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        sqlx::query("DELETE FROM article_positions WHERE article_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_positions(&mut tx, id, &changes.positions).await?;
        tx.commit().await?;

        Ok(row.into_article(changes.positions))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

// --- In-Memory ---

#[derive(Default)]
struct MemoryState {
    // Last id handed out. Only ever grows, so deleted ids are not reused.
    last_id: i64,
    articles: BTreeMap<i64, Article>,
}

/// InMemoryArticleRepository
///
/// `ArticleRepository` kept in process memory. Used when no `DATABASE_URL` is configured
/// in local mode, and by the test suite.
#[derive(Default)]
pub struct InMemoryArticleRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut articles: Vec<Article>) -> Vec<Article> {
    articles.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    articles
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        let state = self.state.read().await;
        Ok(newest_first(state.articles.values().cloned().collect()))
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Article>, StoreError> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .articles
                .values()
                .filter(|article| article.category == category)
                .cloned()
                .collect(),
        ))
    }

    async fn get(&self, id: i64) -> Result<Article, StoreError> {
        let state = self.state.read().await;
        state
            .articles
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create(&self, new: NewArticle) -> Result<Article, StoreError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let article = Article::from_new(state.last_id, new);
        state.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update(&self, id: i64, changes: ArticleChanges) -> Result<Article, StoreError> {
        let mut state = self.state.write().await;
        let article = state
            .articles
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        article.apply(changes);
        Ok(article.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state
            .articles
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}
