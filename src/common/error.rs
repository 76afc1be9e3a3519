// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Corpo da requisição não bate com o payload esperado.
    #[error("Payload inválido: {0}")]
    InvalidPayload(serde_json::Error),

    #[error("Violação de unicidade em '{field}': {message}")]
    UniqueConstraintViolation {
        field: &'static str,
        message: &'static str,
    },

    #[error("{resource} #{id} não encontrado")]
    NotFound { resource: &'static str, id: i64 },

    // Um ID citado no payload aponta para algo que não existe.
    #[error("{resource} #{id} referenciado não existe")]
    RelatedNotFound { resource: &'static str, id: i64 },

    #[error("{resource} #{id} ainda é referenciado por {referenced_by}")]
    ReferenceInUse {
        resource: &'static str,
        id: i64,
        referenced_by: &'static str,
    },

    #[error("Recurso desconhecido: {0}")]
    UnknownResource(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidPayload(_)
            | AppError::RelatedNotFound { .. } => StatusCode::BAD_REQUEST,
            AppError::UniqueConstraintViolation { .. } | AppError::ReferenceInUse { .. } => {
                StatusCode::CONFLICT
            }
            AppError::NotFound { .. } | AppError::UnknownResource(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(message) => message.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::UniqueConstraintViolation { field, message } => json!({
                "error": message,
                "details": { (field.to_string()): [message] },
            }),
            AppError::InvalidPayload(e) => json!({
                "error": "Corpo da requisição inválido.",
                "details": { "body": [e.to_string()] },
            }),
            AppError::InvalidCredentials => json!({ "error": "Usuário ou token inválidos." }),
            AppError::InvalidToken => {
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::Forbidden(permission) => json!({
                "error": format!("Você precisa da permissão '{}' para realizar esta ação.", permission),
            }),

            // Todos os outros erros internos viram 500. O `tracing` loga a
            // mensagem detalhada que `thiserror` nos deu; o cliente não a vê.
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }

            e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(
            AppError::NotFound { resource: "client", id: 1 }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UniqueConstraintViolation {
                field: "username",
                message: "User already exists",
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RelatedNotFound { resource: "label", id: 9 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Forbidden("ROLE_CLIENT_LIST".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn validation_errors_become_bad_request() {
        let mut errors = ValidationErrors::new();
        errors.add("name", ValidationError::new("not_blank"));
        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
