// src/handlers/frontend.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermClient, RequirePermission},
    models::auth::RemindPasswordPayload,
};

// Cadastro público
pub async fn signup(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.clients.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

// Perfil do cliente logado
pub async fn get_me(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermClient>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.clients.me(&actor).await?))
}

pub async fn put_me(
    State(app_state): State<AppState>,
    RequirePermission(actor, _): RequirePermission<PermClient>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.clients.update_me(&actor, payload).await?))
}

// "Esqueci minha senha": sempre 204, exista o usuário ou não.
pub async fn remind_password(
    State(app_state): State<AppState>,
    Json(payload): Json<RemindPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    app_state.clients.remind_password(&payload.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn login_by_token(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(app_state.clients.login_by_token(&token).await?))
}
