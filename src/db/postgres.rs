use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Review, StreamPlatform, Title, TitleFilter},
};

use super::{AggregateFn, Store, ALREADY_REVIEWED, REVIEW_NOT_FOUND, TITLE_NOT_FOUND};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema migrations bundled under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const PLATFORM_COLUMNS: &str = "id, name, about, website";
const TITLE_COLUMNS: &str =
    "id, title, description, platform_id, active, avg_rating, number_rating, created_at";
const REVIEW_COLUMNS: &str = "id, reviewer_id, reviewer_username, title_id, description, rating, \
     active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TitleWithPlatform {
    #[sqlx(flatten)]
    title: Title,
    platform_name: String,
}

/// PostgreSQL-backed store
///
/// Review writes run in a transaction that locks the title row first, so
/// concurrent reviews of one title queue behind each other and dropping the
/// transaction on any error rolls back both the review and the aggregate.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_title(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> AppResult<Title> {
        sqlx::query_as::<_, Title>(&format!(
            "SELECT {TITLE_COLUMNS} FROM titles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(TITLE_NOT_FOUND.to_string()))
    }

    async fn save_aggregate(tx: &mut Transaction<'_, Postgres>, title: &Title) -> AppResult<()> {
        sqlx::query("UPDATE titles SET avg_rating = $1, number_rating = $2 WHERE id = $3")
            .bind(title.avg_rating)
            .bind(title.number_rating)
            .bind(title.id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_title_reviews(tx: &mut Transaction<'_, Postgres>, title_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn list_platforms(&self) -> AppResult<Vec<StreamPlatform>> {
        let platforms = sqlx::query_as::<_, StreamPlatform>(&format!(
            "SELECT {PLATFORM_COLUMNS} FROM stream_platforms ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(platforms)
    }

    async fn get_platform(&self, id: Uuid) -> AppResult<Option<StreamPlatform>> {
        let platform = sqlx::query_as::<_, StreamPlatform>(&format!(
            "SELECT {PLATFORM_COLUMNS} FROM stream_platforms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(platform)
    }

    async fn insert_platform(&self, platform: StreamPlatform) -> AppResult<StreamPlatform> {
        let platform = sqlx::query_as::<_, StreamPlatform>(&format!(
            "INSERT INTO stream_platforms ({PLATFORM_COLUMNS}) VALUES ($1, $2, $3, $4) \
             RETURNING {PLATFORM_COLUMNS}"
        ))
        .bind(platform.id)
        .bind(&platform.name)
        .bind(&platform.about)
        .bind(&platform.website)
        .fetch_one(&self.pool)
        .await?;
        Ok(platform)
    }

    async fn update_platform(&self, platform: StreamPlatform) -> AppResult<Option<StreamPlatform>> {
        let platform = sqlx::query_as::<_, StreamPlatform>(&format!(
            "UPDATE stream_platforms SET name = $2, about = $3, website = $4 WHERE id = $1 \
             RETURNING {PLATFORM_COLUMNS}"
        ))
        .bind(platform.id)
        .bind(&platform.name)
        .bind(&platform.about)
        .bind(&platform.website)
        .fetch_optional(&self.pool)
        .await?;
        Ok(platform)
    }

    async fn delete_platform(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let reviews = sqlx::query(
            "DELETE FROM reviews WHERE title_id IN (SELECT id FROM titles WHERE platform_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let titles = sqlx::query("DELETE FROM titles WHERE platform_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let platforms = sqlx::query("DELETE FROM stream_platforms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            platform_id = %id,
            titles = titles.rows_affected(),
            reviews = reviews.rows_affected(),
            "Cascaded platform delete"
        );
        Ok(platforms.rows_affected() > 0)
    }

    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<Vec<Title>> {
        let rows = sqlx::query_as::<_, TitleWithPlatform>(
            "SELECT t.id, t.title, t.description, t.platform_id, t.active, t.avg_rating, \
             t.number_rating, t.created_at, p.name AS platform_name \
             FROM titles t JOIN stream_platforms p ON p.id = t.platform_id \
             ORDER BY t.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|row| filter.matches(&row.title, &row.platform_name))
            .map(|row| row.title)
            .collect())
    }

    async fn titles_for_platform(&self, platform_id: Uuid) -> AppResult<Vec<Title>> {
        let titles = sqlx::query_as::<_, Title>(&format!(
            "SELECT {TITLE_COLUMNS} FROM titles WHERE platform_id = $1 ORDER BY created_at DESC"
        ))
        .bind(platform_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn get_title(&self, id: Uuid) -> AppResult<Option<Title>> {
        let title = sqlx::query_as::<_, Title>(&format!(
            "SELECT {TITLE_COLUMNS} FROM titles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(title)
    }

    async fn insert_title(&self, title: Title) -> AppResult<Title> {
        let title = sqlx::query_as::<_, Title>(&format!(
            "INSERT INTO titles ({TITLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TITLE_COLUMNS}"
        ))
        .bind(title.id)
        .bind(&title.title)
        .bind(&title.description)
        .bind(title.platform_id)
        .bind(title.active)
        .bind(title.avg_rating)
        .bind(title.number_rating)
        .bind(title.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(title)
    }

    async fn update_title(&self, title: Title) -> AppResult<Option<Title>> {
        let title = sqlx::query_as::<_, Title>(&format!(
            "UPDATE titles SET title = $2, description = $3, platform_id = $4, active = $5 \
             WHERE id = $1 RETURNING {TITLE_COLUMNS}"
        ))
        .bind(title.id)
        .bind(&title.title)
        .bind(&title.description)
        .bind(title.platform_id)
        .bind(title.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(title)
    }

    async fn delete_title(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        Self::delete_title_reviews(&mut tx, id).await?;
        let titles = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(titles.rows_affected() > 0)
    }

    async fn get_review(&self, id: Uuid) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn reviews_for_title(&self, title_id: Uuid) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE title_id = $1 ORDER BY created_at DESC"
        ))
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn reviews_for_user(&self, username: &str) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE reviewer_username = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn create_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)> {
        let mut tx = self.pool.begin().await?;

        let mut title = Self::lock_title(&mut tx, review.title_id).await?;

        let already_reviewed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE title_id = $1 AND reviewer_id = $2)",
        )
        .bind(review.title_id)
        .bind(review.reviewer_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_reviewed {
            return Err(AppError::Conflict(ALREADY_REVIEWED.to_string()));
        }

        aggregate(&mut title, review.rating);
        Self::save_aggregate(&mut tx, &title).await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.id)
        .bind(review.reviewer_id)
        .bind(&review.reviewer_username)
        .bind(review.title_id)
        .bind(&review.description)
        .bind(i16::from(review.rating.get()))
        .bind(review.active)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((review, title))
    }

    async fn update_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)> {
        let mut tx = self.pool.begin().await?;

        let mut title = Self::lock_title(&mut tx, review.title_id).await?;
        aggregate(&mut title, review.rating);
        Self::save_aggregate(&mut tx, &title).await?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET description = $2, rating = $3, active = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.id)
        .bind(&review.description)
        .bind(i16::from(review.rating.get()))
        .bind(review.active)
        .bind(review.updated_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))?;

        tx.commit().await?;
        Ok((review, title))
    }

    async fn delete_review(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
