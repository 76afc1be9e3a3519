// src/services/auth.rs

use bcrypt::hash;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    graph::{EntityGraph, EntityId},
    models::{
        auth::{Actor, Claims},
        Client,
    },
};

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    access_token_ttl: Duration,
    reset_token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: String, access_token_ttl: Duration, reset_token_ttl: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_ttl,
            reset_token_ttl,
        }
    }

    /// bcrypt é caro: roda numa thread de bloqueio.
    pub async fn hash_password(&self, plain: &str) -> Result<String, AppError> {
        let plain = plain.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&plain, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    /// Faz o hash de toda `plainPassword` pendente no grafo e apaga o texto
    /// puro. Chamado depois da validação e antes do flush.
    pub async fn hash_pending_passwords(&self, graph: &mut EntityGraph) -> Result<usize, AppError> {
        let pending: Vec<(EntityId<Client>, String)> = graph
            .iter::<Client>()
            .filter_map(|(id, client)| client.plain_password().map(|plain| (id, plain.to_string())))
            .collect();

        for (id, plain) in &pending {
            let hashed = self.hash_password(plain).await?;
            graph.update(*id, |client| {
                client.set_password(hashed);
                client.erase_credentials();
            })?;
        }
        Ok(pending.len())
    }

    pub fn create_token(&self, actor: &Actor) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;

        let claims = Claims {
            sub: actor.username.clone(),
            roles: actor.roles.clone(),
            client_id: actor.client_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn validate_token(&self, token: &str) -> Result<Actor, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims.into())
    }

    /// Token de recuperação de senha (64 hex).
    pub fn generate_reset_token(&self) -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    pub fn reset_token_is_fresh(&self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        created_at.is_some_and(|created_at| now - created_at <= self.reset_token_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("segredo-de-teste".into(), Duration::hours(1), Duration::minutes(60))
    }

    #[test]
    fn tokens_round_trip_the_actor() {
        let auth = service();
        let actor = Actor {
            username: "ana@example.com".into(),
            roles: vec!["ROLE_CLIENT".into()],
            client_id: Some(7),
        };
        let token = auth.create_token(&actor).unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), actor);
        assert!(matches!(auth.validate_token("lixo"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn reset_tokens_expire() {
        let auth = service();
        let now = Utc::now();
        assert!(auth.reset_token_is_fresh(Some(now - Duration::minutes(5)), now));
        assert!(!auth.reset_token_is_fresh(Some(now - Duration::minutes(61)), now));
        assert!(!auth.reset_token_is_fresh(None, now));
        assert_eq!(auth.generate_reset_token().len(), 64);
    }

    #[tokio::test]
    async fn pending_passwords_are_hashed_and_erased() {
        let auth = service();
        let mut graph = EntityGraph::new();
        let client = graph.persist(Client::new("Ana", "ana@example.com"));
        graph
            .update(client, |c| c.set_plain_password(Some("segredo".into())))
            .unwrap();

        assert_eq!(auth.hash_pending_passwords(&mut graph).await.unwrap(), 1);
        let stored = graph.find(client).unwrap();
        assert_eq!(stored.plain_password(), None);
        assert!(bcrypt::verify("segredo", stored.password()).unwrap());
    }
}
