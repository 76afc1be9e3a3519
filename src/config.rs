// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{GraphStore, MemoryStore, PgStore},
    middleware::rbac::{Authorizer, RoleAuthorizer},
    services::{AuthService, ClientService, HistoryService, ResourceService},
};

// ---
// Configuração lida do ambiente (.env)
// ---

#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    /// Ausente = store em memória.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub reset_token_ttl: chrono::Duration,
    pub access_token_ttl: chrono::Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            jwt_secret,
            database_url,
            bind_addr,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            reset_token_ttl: chrono::Duration::minutes(parse_var("RESET_TOKEN_TTL_MINUTES", 60)?),
            access_token_ttl: chrono::Duration::hours(parse_var("ACCESS_TOKEN_TTL_HOURS", 168)?),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} inválido: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

// ---
// Estado compartilhado pelos handlers
// ---

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub auth_service: AuthService,
    pub authorizer: Arc<dyn Authorizer>,
    pub resources: ResourceService,
    pub clients: ClientService,
    pub histories: HistoryService,
}

impl AppState {
    // Conecta ao banco (se configurado) e roda as migrações.
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn GraphStore> = match &settings.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.database_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!().run(&db_pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgStore::new(db_pool))
            }
            None => {
                tracing::warn!("DATABASE_URL ausente: usando store em memória (dados se perdem ao reiniciar)");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(store, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(store: Arc<dyn GraphStore>, settings: &Settings) -> Self {
        let auth_service = AuthService::new(
            settings.jwt_secret.clone(),
            settings.access_token_ttl,
            settings.reset_token_ttl,
        );

        Self {
            resources: ResourceService::new(Arc::clone(&store), auth_service.clone()),
            clients: ClientService::new(Arc::clone(&store), auth_service.clone()),
            histories: HistoryService::new(Arc::clone(&store)),
            authorizer: Arc::new(RoleAuthorizer),
            auth_service,
            store,
        }
    }
}
