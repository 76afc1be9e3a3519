// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

// Exige `Authorization: Bearer <jwt>` e coloca o `Actor` nos extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::InvalidToken)?;

    let actor = app_state
        .auth_service
        .validate_token(bearer.token())
        .inspect_err(|_| tracing::warn!("Token rejeitado em {}", parts.uri.path()))?;

    parts.extensions.insert(actor);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

// Extrator para obter o ator autenticado diretamente nos handlers
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthenticatedActor)
            .ok_or(AppError::InvalidToken)
    }
}
