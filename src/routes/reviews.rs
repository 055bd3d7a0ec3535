use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::CurrentActor,
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Rating, Review, ReviewInput, Title},
    routes::{
        extract::{ValidJson, ValidPath},
        AppState,
    },
    services::ReviewWrite,
};

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub review_user: String,
    pub title_id: Uuid,
    pub description: Option<String>,
    pub rating: Rating,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            review_user: review.reviewer_username,
            title_id: review.title_id,
            description: review.description,
            rating: review.rating,
            active: review.active,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleRating {
    pub avg_rating: f64,
    pub number_rating: i32,
}

impl From<&Title> for TitleRating {
    fn from(title: &Title) -> Self {
        Self {
            avg_rating: title.avg_rating,
            number_rating: title.number_rating,
        }
    }
}

/// A written review and the aggregate of the title it belongs to
#[derive(Debug, Serialize)]
pub struct ReviewWriteResponse {
    #[serde(flatten)]
    pub review: ReviewResponse,
    pub title_rating: TitleRating,
}

impl From<ReviewWrite> for ReviewWriteResponse {
    fn from(write: ReviewWrite) -> Self {
        Self {
            title_rating: TitleRating::from(&write.title),
            review: write.review.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserReviewsQuery {
    username: Option<String>,
}

fn responses(reviews: Vec<Review>) -> Vec<ReviewResponse> {
    reviews.into_iter().map(Into::into).collect()
}

pub async fn list_for_title(
    State(state): State<Arc<AppState>>,
    ValidPath(title_id): ValidPath<Uuid>,
) -> AppResult<Json<Vec<ReviewResponse>>> {
    let reviews = state.ledger.reviews_for_title(title_id).await?;
    Ok(Json(responses(reviews)))
}

pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserReviewsQuery>,
) -> AppResult<Json<Vec<ReviewResponse>>> {
    let Some(username) = params.username.filter(|name| !name.trim().is_empty()) else {
        return Ok(Json(Vec::new()));
    };

    let reviews = state.ledger.reviews_for_user(&username).await?;
    Ok(Json(responses(reviews)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Json<ReviewResponse>> {
    let review = state.ledger.get_review(id).await?;
    Ok(Json(review.into()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ValidPath(title_id): ValidPath<Uuid>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<ReviewInput>,
) -> AppResult<(StatusCode, Json<ReviewWriteResponse>)> {
    tracing::debug!(request_id = %request_id, title_id = %title_id, "Creating review");

    let write = state.ledger.create_review(actor.actor(), title_id, input).await?;
    Ok((StatusCode::CREATED, Json(write.into())))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<ReviewInput>,
) -> AppResult<Json<ReviewWriteResponse>> {
    tracing::debug!(request_id = %request_id, review_id = %id, "Updating review");

    let write = state.ledger.update_review(actor.actor(), id, input).await?;
    Ok(Json(write.into()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
) -> AppResult<StatusCode> {
    state.ledger.delete_review(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
