pub mod memory;
pub mod postgres;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Rating, Review, StreamPlatform, Title, TitleFilter},
};

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};

/// Folds a freshly written rating into a title's aggregate
pub type AggregateFn = fn(&mut Title, Rating);

/// Persistence for platforms, titles and reviews
///
/// Deletes cascade explicitly: removing a platform removes its titles, and
/// removing a title removes its reviews. Review writes and the paired aggregate
/// update are applied as one unit, serialized per title.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn list_platforms(&self) -> AppResult<Vec<StreamPlatform>>;

    async fn get_platform(&self, id: Uuid) -> AppResult<Option<StreamPlatform>>;

    async fn insert_platform(&self, platform: StreamPlatform) -> AppResult<StreamPlatform>;

    /// Returns `None` when the platform no longer exists
    async fn update_platform(&self, platform: StreamPlatform) -> AppResult<Option<StreamPlatform>>;

    /// Removes the platform, its titles and their reviews. Returns whether the platform existed.
    async fn delete_platform(&self, id: Uuid) -> AppResult<bool>;

    /// Titles matching `filter`, newest first
    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<Vec<Title>>;

    /// Titles hosted by one platform, newest first
    async fn titles_for_platform(&self, platform_id: Uuid) -> AppResult<Vec<Title>>;

    async fn get_title(&self, id: Uuid) -> AppResult<Option<Title>>;

    async fn insert_title(&self, title: Title) -> AppResult<Title>;

    /// Writes the descriptive fields only. The stored aggregate is left untouched.
    async fn update_title(&self, title: Title) -> AppResult<Option<Title>>;

    /// Removes the title and its reviews. Returns whether the title existed.
    async fn delete_title(&self, id: Uuid) -> AppResult<bool>;

    async fn get_review(&self, id: Uuid) -> AppResult<Option<Review>>;

    /// Reviews of one title, newest first
    async fn reviews_for_title(&self, title_id: Uuid) -> AppResult<Vec<Review>>;

    /// Reviews written by `username`, newest first
    async fn reviews_for_user(&self, username: &str) -> AppResult<Vec<Review>>;

    /// Inserts `review` and folds its rating into the title aggregate as one unit
    ///
    /// Fails with `NotFound` when the title is missing and with `Conflict` when
    /// the reviewer already reviewed the title. Nothing is written on failure.
    async fn create_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)>;

    /// Overwrites `review` and folds its rating into the title aggregate as one unit
    ///
    /// Fails with `NotFound` when the review or its title is missing.
    async fn update_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)>;

    /// Removes the review without touching the title aggregate
    async fn delete_review(&self, id: Uuid) -> AppResult<bool>;
}

pub(crate) const TITLE_NOT_FOUND: &str = "Title not found";
pub(crate) const REVIEW_NOT_FOUND: &str = "Review not found";
pub(crate) const ALREADY_REVIEWED: &str = "You have already reviewed this title";
