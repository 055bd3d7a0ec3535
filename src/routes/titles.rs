use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    auth::CurrentActor,
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Title, TitleFilter, TitleInput},
    routes::{
        extract::{ValidJson, ValidPath},
        AppState,
    },
};

/// Lists titles, optionally narrowed with `?search=`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(filter): Query<TitleFilter>,
) -> AppResult<Json<Vec<Title>>> {
    tracing::debug!(
        request_id = %request_id,
        search = ?filter.search,
        "Listing titles"
    );

    let titles = state.catalog.list_titles(&filter).await?;
    Ok(Json(titles))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Json<Title>> {
    let title = state.catalog.get_title(id).await?;
    Ok(Json(title))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<TitleInput>,
) -> AppResult<(StatusCode, Json<Title>)> {
    let title = state.catalog.create_title(actor.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<TitleInput>,
) -> AppResult<Json<Title>> {
    let title = state.catalog.update_title(actor.actor(), id, input).await?;
    Ok(Json(title))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
) -> AppResult<StatusCode> {
    state.catalog.delete_title(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
