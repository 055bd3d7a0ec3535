use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::CurrentActor,
    error::AppResult,
    models::{PlatformInput, Title},
    routes::{
        extract::{ValidJson, ValidPath},
        AppState,
    },
    services::PlatformDetail,
};

#[derive(Debug, Serialize)]
pub struct PlatformResponse {
    pub id: Uuid,
    pub name: String,
    pub about: String,
    pub website: String,
    pub watchlist: Vec<Title>,
}

impl From<PlatformDetail> for PlatformResponse {
    fn from(detail: PlatformDetail) -> Self {
        let PlatformDetail { platform, titles } = detail;
        Self {
            id: platform.id,
            name: platform.name,
            about: platform.about,
            website: platform.website,
            watchlist: titles,
        }
    }
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<PlatformResponse>>> {
    let platforms = state.catalog.list_platforms().await?;
    Ok(Json(platforms.into_iter().map(Into::into).collect()))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
) -> AppResult<Json<PlatformResponse>> {
    let platform = state.catalog.get_platform(id).await?;
    Ok(Json(platform.into()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<PlatformInput>,
) -> AppResult<(StatusCode, Json<PlatformResponse>)> {
    let platform = state.catalog.create_platform(actor.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(platform.into())))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
    ValidJson(input): ValidJson<PlatformInput>,
) -> AppResult<Json<PlatformResponse>> {
    let platform = state.catalog.update_platform(actor.actor(), id, input).await?;
    Ok(Json(platform.into()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<Uuid>,
    actor: CurrentActor,
) -> AppResult<StatusCode> {
    state.catalog.delete_platform(actor.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
