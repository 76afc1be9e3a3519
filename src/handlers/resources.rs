// src/handlers/resources.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use crate::{
    common::error::AppError,
    config::AppState,
    graph::EntityKind,
    middleware::{
        auth::AuthenticatedActor,
        rbac::{authorize, Operation},
    },
};

// "/api/contact_types" -> ContactType
fn resource_kind(resource: &str) -> Result<EntityKind, AppError> {
    EntityKind::ALL
        .into_iter()
        .find(|kind| kind.collection_path() == resource)
        .ok_or_else(|| AppError::UnknownResource(resource.to_string()))
}

// ---
// COLEÇÃO
// ---

pub async fn list(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(resource): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let kind = resource_kind(&resource)?;
    authorize(app_state.authorizer.as_ref(), &actor, kind, Operation::List)?;

    let page = app_state.resources.list(kind, &query).await?;
    Ok(Json(page))
}

pub async fn create(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(resource): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let kind = resource_kind(&resource)?;
    authorize(app_state.authorizer.as_ref(), &actor, kind, Operation::Create)?;

    let created = app_state.resources.create(kind, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ---
// ITEM
// ---

pub async fn show(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path((resource, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = resource_kind(&resource)?;
    authorize(app_state.authorizer.as_ref(), &actor, kind, Operation::Show)?;

    Ok(Json(app_state.resources.show(kind, id).await?))
}

pub async fn update(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path((resource, id)): Path<(String, i64)>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let kind = resource_kind(&resource)?;
    authorize(app_state.authorizer.as_ref(), &actor, kind, Operation::Update)?;

    let updated = app_state.resources.update(kind, &actor, id, payload).await?;
    Ok(Json(updated))
}

pub async fn delete(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path((resource, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = resource_kind(&resource)?;
    authorize(app_state.authorizer.as_ref(), &actor, kind, Operation::Delete)?;

    app_state.resources.delete(kind, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
