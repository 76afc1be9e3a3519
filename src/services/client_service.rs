// src/services/client_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    common::error::AppError,
    db::GraphStore,
    graph::{EntityGraph, EntityId, EntityKind, EntityRef},
    metadata::{validation, views},
    models::{
        auth::{Actor, AuthResponse},
        client::ClientInput,
        Client, Writable,
    },
    services::auth::AuthService,
};

// Fluxos de autoatendimento do cliente (rotas /api/frontend).
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn GraphStore>,
    auth_service: AuthService,
}

impl ClientService {
    pub fn new(store: Arc<dyn GraphStore>, auth_service: AuthService) -> Self {
        Self { store, auth_service }
    }

    // =========================================================================
    //  1. CADASTRO PÚBLICO
    // =========================================================================

    pub async fn signup(&self, body: Value) -> Result<Value, AppError> {
        let mut graph = self.store.begin(None).await?;

        let body = views::writable(EntityKind::Client, views::SIGNUP_COLLECTION, body);
        let input: ClientInput = serde_json::from_value(body).map_err(AppError::InvalidPayload)?;
        let id = Client::create(&mut graph, input)?;

        validation::validate(&graph, EntityRef::of(id), validation::CLIENT_SIGNUP)?;
        self.auth_service.hash_pending_passwords(&mut graph).await?;
        self.store.flush(&mut graph).await?;

        tracing::info!("Novo cliente cadastrado: #{}", id);
        project(&graph, id, views::CLIENT_GET_ITEM)
    }

    // =========================================================================
    //  2. PERFIL DO PRÓPRIO CLIENTE
    // =========================================================================

    pub async fn me(&self, actor: &Actor) -> Result<Value, AppError> {
        let graph = self.store.begin(Some(actor.username.clone())).await?;
        let id = find_actor_client(&graph, actor)?;
        project(&graph, id, views::CLIENT_GET_ITEM)
    }

    pub async fn update_me(&self, actor: &Actor, body: Value) -> Result<Value, AppError> {
        let mut graph = self.store.begin(Some(actor.username.clone())).await?;
        let id = find_actor_client(&graph, actor)?;

        let body = views::writable(EntityKind::Client, views::CLIENT_PUT_ITEM, body);
        let input: ClientInput = serde_json::from_value(body).map_err(AppError::InvalidPayload)?;
        Client::apply(&mut graph, id, input)?;

        validation::validate(&graph, EntityRef::of(id), validation::CLIENT_PUT)?;
        self.store.flush(&mut graph).await?;
        project(&graph, id, views::CLIENT_PUT_ITEM)
    }

    // =========================================================================
    //  3. RECUPERAÇÃO DE SENHA
    // =========================================================================

    /// Gera um token de recuperação. Username desconhecido responde igual
    /// (não revela quem existe).
    pub async fn remind_password(&self, username: &str) -> Result<(), AppError> {
        let mut graph = self.store.begin(None).await?;
        let Some(id) = find_by(&graph, |client| client.username == username) else {
            tracing::info!("Recuperação de senha pedida para usuário inexistente");
            return Ok(());
        };

        let token = self.auth_service.generate_reset_token();
        graph.update(id, |client| client.set_token(Some(token), Utc::now()))?;
        self.store.flush(&mut graph).await?;

        // A entrega do token (e-mail) fica fora deste serviço.
        tracing::info!("Token de recuperação gerado para o cliente #{}", id);
        Ok(())
    }

    /// Troca um token de recuperação válido por um bearer token.
    /// O token de recuperação é consumido.
    pub async fn login_by_token(&self, token: &str) -> Result<AuthResponse, AppError> {
        let mut graph = self.store.begin(None).await?;
        let id = find_by(&graph, |client| client.token() == Some(token)).ok_or(AppError::InvalidCredentials)?;

        let client = graph.find(id)?;
        if !self
            .auth_service
            .reset_token_is_fresh(client.token_created_at(), Utc::now())
        {
            tracing::warn!("Token de recuperação expirado para o cliente #{}", id);
            return Err(AppError::InvalidCredentials);
        }

        let actor = Actor {
            username: client.username.clone(),
            roles: client.roles().iter().map(|role| role.to_string()).collect(),
            client_id: Some(id.get()),
        };

        graph.update(id, |client| client.set_token(None, Utc::now()))?;
        self.store.flush(&mut graph).await?;

        Ok(AuthResponse {
            token: self.auth_service.create_token(&actor)?,
        })
    }
}

fn find_by(graph: &EntityGraph, predicate: impl Fn(&Client) -> bool) -> Option<EntityId<Client>> {
    graph
        .iter::<Client>()
        .find(|(_, client)| predicate(client))
        .map(|(id, _)| id)
}

// Pelo `client_id` do token; tokens antigos só trazem o username.
fn find_actor_client(graph: &EntityGraph, actor: &Actor) -> Result<EntityId<Client>, AppError> {
    let found = match actor.client_id {
        Some(raw) => Some(EntityId::new(raw)).filter(|id| graph.contains(*id)),
        None => find_by(graph, |client| client.username == actor.username),
    };
    found.ok_or(AppError::NotFound {
        resource: "client",
        id: actor.client_id.unwrap_or_default(),
    })
}

fn project(graph: &EntityGraph, id: EntityId<Client>, groups: &[&str]) -> Result<Value, AppError> {
    views::project(graph, EntityRef::of(id), groups).ok_or(AppError::NotFound {
        resource: "client",
        id: id.get(),
    })
}
