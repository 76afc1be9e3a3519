// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::{fmt, marker::PhantomData};

use crate::{
    common::error::AppError,
    config::AppState,
    graph::EntityKind,
    models::auth::Actor,
};

// ---
// Permissões por recurso e operação
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Show,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "LIST",
            Operation::Create => "CREATE",
            Operation::Show => "SHOW",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissão exigida (ex: `ROLE_PROJECT_TYPE_LIST`). `None` = qualquer
/// usuário autenticado.
pub fn required_permission(kind: EntityKind, operation: Operation) -> Option<String> {
    match kind {
        EntityKind::Client | EntityKind::Contact | EntityKind::Module | EntityKind::ProjectType => Some(
            format!("ROLE_{}_{}", kind.slug().to_uppercase(), operation),
        ),
        _ => None,
    }
}

pub const SUPER_ADMIN: &str = "ROLE_SUPER_ADMIN";

/// Decide se o ator tem uma permissão.
pub trait Authorizer: Send + Sync {
    fn is_granted(&self, actor: &Actor, permission: &str) -> bool;
}

/// Permissões = papéis do token. `ROLE_SUPER_ADMIN` libera tudo.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn is_granted(&self, actor: &Actor, permission: &str) -> bool {
        actor.has_role(SUPER_ADMIN) || actor.has_role(permission)
    }
}

pub fn authorize(
    authorizer: &dyn Authorizer,
    actor: &Actor,
    kind: EntityKind,
    operation: Operation,
) -> Result<(), AppError> {
    match required_permission(kind, operation) {
        Some(permission) if !authorizer.is_granted(actor, &permission) => {
            tracing::warn!("{} sem a permissão {}", actor.username, permission);
            Err(AppError::Forbidden(permission))
        }
        _ => Ok(()),
    }
}

// ---
// Extractor para rotas com permissão fixa
// ---

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião). Entrega o ator já autorizado.
pub struct RequirePermission<T>(pub Actor, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. Ator colocado pelo auth_guard
        let actor = parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        // B. Checa a permissão
        let required = T::slug();
        if !app_state.authorizer.is_granted(&actor, required) {
            tracing::warn!("{} sem a permissão {}", actor.username, required);
            return Err(AppError::Forbidden(required.to_string()));
        }

        Ok(RequirePermission(actor, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermClient;
impl PermissionDef for PermClient {
    fn slug() -> &'static str { "ROLE_CLIENT" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(roles: &[&str]) -> Actor {
        Actor {
            username: "admin".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            client_id: None,
        }
    }

    #[test]
    fn only_guarded_resources_require_a_permission() {
        assert_eq!(
            required_permission(EntityKind::ProjectType, Operation::List).as_deref(),
            Some("ROLE_PROJECT_TYPE_LIST")
        );
        assert_eq!(
            required_permission(EntityKind::Client, Operation::Delete).as_deref(),
            Some("ROLE_CLIENT_DELETE")
        );
        assert_eq!(required_permission(EntityKind::Label, Operation::Create), None);
    }

    #[test]
    fn super_admin_is_granted_everything() {
        let authorizer = RoleAuthorizer;
        assert!(authorize(&authorizer, &actor(&[SUPER_ADMIN]), EntityKind::Module, Operation::Update).is_ok());
        assert!(authorize(&authorizer, &actor(&["ROLE_MODULE_UPDATE"]), EntityKind::Module, Operation::Update).is_ok());

        match authorize(&authorizer, &actor(&["ROLE_MODULE_LIST"]), EntityKind::Module, Operation::Update) {
            Err(AppError::Forbidden(permission)) => assert_eq!(permission, "ROLE_MODULE_UPDATE"),
            other => panic!("esperava 403, veio {:?}", other),
        }
    }
}
