use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{Store, REVIEW_NOT_FOUND},
    error::{AppError, AppResult},
    models::{Actor, Rating, Review, ReviewInput, Title},
    policy::{self, Operation, ResourceKind},
};

/// Folds one rating into a title's aggregate
///
/// Applied on both review creation and review update. Each new rating is
/// averaged with the current value, so recent ratings weigh more than older
/// ones. This is not an arithmetic mean of all ratings. Updates fold the new
/// rating in again instead of replacing the old one, and deletes never unwind.
pub fn apply_rating(title: &mut Title, rating: Rating) {
    let rating = f64::from(rating.get());
    if title.number_rating == 0 {
        title.avg_rating = rating;
    } else {
        title.avg_rating = (title.avg_rating + rating) / 2.0;
    }
    title.number_rating += 1;
}

/// A review write together with the title aggregate it produced
#[derive(Debug, Clone)]
pub struct ReviewWrite {
    pub review: Review,
    pub title: Title,
}

/// Owns review records and the rating aggregate they feed
pub struct ReviewLedger {
    store: Arc<dyn Store>,
}

impl ReviewLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn find(&self, review_id: Uuid) -> AppResult<Review> {
        self.store
            .get_review(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(REVIEW_NOT_FOUND.to_string()))
    }

    /// Records `actor`'s first and only review of a title
    #[instrument(skip(self, actor, input), fields(actor = actor.map(|a| a.username.as_str())))]
    pub async fn create_review(
        &self,
        actor: Option<&Actor>,
        title_id: Uuid,
        input: ReviewInput,
    ) -> AppResult<ReviewWrite> {
        let actor = policy::authenticated(actor)?;
        policy::require(Some(actor), ResourceKind::Review, Operation::Create, None)?;

        let (rating, description) = input.validate_new()?;
        let review = Review::new(actor, title_id, rating, description);

        let (review, title) = self.store.create_review(review, apply_rating).await?;

        tracing::info!(
            review_id = %review.id,
            avg_rating = title.avg_rating,
            number_rating = title.number_rating,
            "Review created"
        );
        Ok(ReviewWrite { review, title })
    }

    /// Edits a review on behalf of its author and folds the resulting rating in again
    #[instrument(skip(self, actor, input), fields(actor = actor.map(|a| a.username.as_str())))]
    pub async fn update_review(
        &self,
        actor: Option<&Actor>,
        review_id: Uuid,
        input: ReviewInput,
    ) -> AppResult<ReviewWrite> {
        let actor = policy::authenticated(actor)?;

        let mut review = self.find(review_id).await?;
        policy::require(
            Some(actor),
            ResourceKind::Review,
            Operation::Update,
            Some(review.reviewer_id),
        )?;

        let changes = input.validate()?;
        review.apply(changes);

        let (review, title) = self.store.update_review(review, apply_rating).await?;

        tracing::info!(
            title_id = %title.id,
            avg_rating = title.avg_rating,
            number_rating = title.number_rating,
            "Review updated"
        );
        Ok(ReviewWrite { review, title })
    }

    /// Removes a review. The title aggregate is left as it was.
    #[instrument(skip(self, actor), fields(actor = actor.map(|a| a.username.as_str())))]
    pub async fn delete_review(&self, actor: Option<&Actor>, review_id: Uuid) -> AppResult<()> {
        let actor = policy::authenticated(actor)?;

        let review = self.find(review_id).await?;
        policy::require(
            Some(actor),
            ResourceKind::Review,
            Operation::Delete,
            Some(review.reviewer_id),
        )?;

        if !self.store.delete_review(review_id).await? {
            return Err(AppError::NotFound(REVIEW_NOT_FOUND.to_string()));
        }

        tracing::info!(title_id = %review.title_id, "Review deleted");
        Ok(())
    }

    pub async fn get_review(&self, review_id: Uuid) -> AppResult<Review> {
        self.find(review_id).await
    }

    pub async fn reviews_for_title(&self, title_id: Uuid) -> AppResult<Vec<Review>> {
        self.store.reviews_for_title(title_id).await
    }

    pub async fn reviews_for_user(&self, username: &str) -> AppResult<Vec<Review>> {
        self.store.reviews_for_user(username).await
    }
}
