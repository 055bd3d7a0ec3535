use std::cmp::Reverse;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Review, StreamPlatform, Title, TitleFilter},
};

use super::{AggregateFn, Store, ALREADY_REVIEWED, REVIEW_NOT_FOUND, TITLE_NOT_FOUND};

/// Records kept in insertion order
#[derive(Default)]
struct Tables {
    platforms: Vec<StreamPlatform>,
    titles: Vec<Title>,
    reviews: Vec<Review>,
}

/// Process-local store
///
/// Every mutation holds the write guard for its whole duration, so a review
/// write and its aggregate update are never observed apart and concurrent
/// writers to the same title are serialized. All checks run before the first
/// mutation, so a failed call leaves the tables untouched.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first. Ties keep the most recently inserted record first.
fn newest_first<T: Clone, K: Ord>(records: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut sorted: Vec<T> = records.iter().rev().cloned().collect();
    sorted.sort_by_key(|record| Reverse(key(record)));
    sorted
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn list_platforms(&self) -> AppResult<Vec<StreamPlatform>> {
        Ok(self.tables.read().await.platforms.clone())
    }

    async fn get_platform(&self, id: Uuid) -> AppResult<Option<StreamPlatform>> {
        let tables = self.tables.read().await;
        Ok(tables.platforms.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_platform(&self, platform: StreamPlatform) -> AppResult<StreamPlatform> {
        self.tables.write().await.platforms.push(platform.clone());
        Ok(platform)
    }

    async fn update_platform(&self, platform: StreamPlatform) -> AppResult<Option<StreamPlatform>> {
        let mut tables = self.tables.write().await;
        match tables.platforms.iter_mut().find(|p| p.id == platform.id) {
            Some(existing) => {
                *existing = platform.clone();
                Ok(Some(platform))
            }
            None => Ok(None),
        }
    }

    async fn delete_platform(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.platforms.iter().any(|p| p.id == id) {
            return Ok(false);
        }

        let title_ids: Vec<Uuid> = tables
            .titles
            .iter()
            .filter(|t| t.platform_id == id)
            .map(|t| t.id)
            .collect();

        tables.reviews.retain(|r| !title_ids.contains(&r.title_id));
        tables.titles.retain(|t| t.platform_id != id);
        tables.platforms.retain(|p| p.id != id);

        tracing::debug!(platform_id = %id, titles = title_ids.len(), "Cascaded platform delete");
        Ok(true)
    }

    async fn list_titles(&self, filter: &TitleFilter) -> AppResult<Vec<Title>> {
        let tables = self.tables.read().await;
        let matching: Vec<Title> = tables
            .titles
            .iter()
            .filter(|title| {
                let platform_name = tables
                    .platforms
                    .iter()
                    .find(|p| p.id == title.platform_id)
                    .map(|p| p.name.as_str())
                    .unwrap_or_default();
                filter.matches(title, platform_name)
            })
            .cloned()
            .collect();

        Ok(newest_first(&matching, |t| t.created_at))
    }

    async fn titles_for_platform(&self, platform_id: Uuid) -> AppResult<Vec<Title>> {
        let tables = self.tables.read().await;
        let titles: Vec<Title> = tables
            .titles
            .iter()
            .filter(|t| t.platform_id == platform_id)
            .cloned()
            .collect();

        Ok(newest_first(&titles, |t| t.created_at))
    }

    async fn get_title(&self, id: Uuid) -> AppResult<Option<Title>> {
        let tables = self.tables.read().await;
        Ok(tables.titles.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_title(&self, title: Title) -> AppResult<Title> {
        let mut tables = self.tables.write().await;
        if !tables.platforms.iter().any(|p| p.id == title.platform_id) {
            return Err(AppError::NotFound("Stream platform not found".to_string()));
        }
        tables.titles.push(title.clone());
        Ok(title)
    }

    async fn update_title(&self, title: Title) -> AppResult<Option<Title>> {
        let mut tables = self.tables.write().await;
        if !tables.platforms.iter().any(|p| p.id == title.platform_id) {
            return Err(AppError::NotFound("Stream platform not found".to_string()));
        }

        let Some(existing) = tables.titles.iter_mut().find(|t| t.id == title.id) else {
            return Ok(None);
        };
        existing.title = title.title;
        existing.description = title.description;
        existing.platform_id = title.platform_id;
        existing.active = title.active;

        Ok(Some(existing.clone()))
    }

    async fn delete_title(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.titles.iter().any(|t| t.id == id) {
            return Ok(false);
        }

        tables.reviews.retain(|r| r.title_id != id);
        tables.titles.retain(|t| t.id != id);
        Ok(true)
    }

    async fn get_review(&self, id: Uuid) -> AppResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn reviews_for_title(&self, title_id: Uuid) -> AppResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.title_id == title_id)
            .cloned()
            .collect();

        Ok(newest_first(&reviews, |r| r.created_at))
    }

    async fn reviews_for_user(&self, username: &str) -> AppResult<Vec<Review>> {
        let tables = self.tables.read().await;
        let reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.reviewer_username == username)
            .cloned()
            .collect();

        Ok(newest_first(&reviews, |r| r.created_at))
    }

    async fn create_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)> {
        let mut tables = self.tables.write().await;

        let mut title = tables
            .titles
            .iter()
            .find(|t| t.id == review.title_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(TITLE_NOT_FOUND.to_string()))?;

        let already_reviewed = tables
            .reviews
            .iter()
            .any(|r| r.title_id == review.title_id && r.reviewer_id == review.reviewer_id);
        if already_reviewed {
            return Err(AppError::Conflict(ALREADY_REVIEWED.to_string()));
        }

        aggregate(&mut title, review.rating);

        if let Some(stored) = tables.titles.iter_mut().find(|t| t.id == title.id) {
            stored.avg_rating = title.avg_rating;
            stored.number_rating = title.number_rating;
        }
        tables.reviews.push(review.clone());

        Ok((review, title))
    }

    async fn update_review(&self, review: Review, aggregate: AggregateFn) -> AppResult<(Review, Title)> {
        let mut tables = self.tables.write().await;

        let review_index = tables
            .reviews
            .iter()
            .position(|r| r.id == review.id)
            .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))?;

        let mut title = tables
            .titles
            .iter()
            .find(|t| t.id == review.title_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(TITLE_NOT_FOUND.to_string()))?;

        aggregate(&mut title, review.rating);

        if let Some(stored) = tables.titles.iter_mut().find(|t| t.id == title.id) {
            stored.avg_rating = title.avg_rating;
            stored.number_rating = title.number_rating;
        }
        tables.reviews[review_index] = review.clone();

        Ok((review, title))
    }

    async fn delete_review(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }
}
