// src/handlers/history.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{common::error::AppError, config::AppState};

pub async fn list(
    State(app_state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.histories.list(&query).await?))
}

pub async fn show(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.histories.show(id).await?))
}

// /histories/{entity}/{entity_id}
pub async fn for_entity(
    State(app_state): State<AppState>,
    Path((entity, entity_id)): Path<(String, String)>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .histories
        .for_entity(&entity, &entity_id, &query)
        .await?;
    Ok(Json(page))
}
