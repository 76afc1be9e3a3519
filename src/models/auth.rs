// src/models/auth.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Quem está fazendo a requisição (extraído do bearer token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub roles: Vec<String>,
    /// Presente quando o token foi emitido para um `Client` (rotas /frontend).
    pub client_id: Option<i64>,
}

impl Actor {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|current| current == role)
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            roles: claims.roles,
            client_id: claims.client_id,
        }
    }
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

// Dados para "esqueci minha senha"
#[derive(Debug, Deserialize, Validate)]
pub struct RemindPasswordPayload {
    #[validate(length(min = 1, message = "This value should not be blank."))]
    pub username: String,
}
