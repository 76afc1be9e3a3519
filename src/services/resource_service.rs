// src/services/resource_service.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::error::AppError,
    db::GraphStore,
    graph::{with_resource, EntityGraph, EntityId, EntityKind, EntityRef},
    metadata::{
        filters::resolve_in_graph,
        validation, views, CollectionQuery, Page,
    },
    models::{auth::Actor, Writable},
    services::auth::AuthService,
};

// =========================================================================
//  CRUD GENÉRICO
// =========================================================================
//
// Um serviço só para os 13 recursos: o `EntityKind` escolhe o tipo
// concreto, as tabelas de metadata dizem o que ler, escrever e validar.

#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn GraphStore>,
    auth_service: AuthService,
}

impl ResourceService {
    pub fn new(store: Arc<dyn GraphStore>, auth_service: AuthService) -> Self {
        Self { store, auth_service }
    }

    pub async fn list(&self, kind: EntityKind, query: &[(String, String)]) -> Result<Page<Value>, AppError> {
        let graph = self.store.begin(None).await?;
        let query = CollectionQuery::for_kind(kind, query);

        let page = query.apply(graph.refs(kind), |entity, path| resolve_in_graph(&graph, *entity, path));
        let groups = views::contexts(kind).collection;
        Ok(page.map(|entity| views::project(&graph, entity, groups).unwrap_or(Value::Null)))
    }

    pub async fn show(&self, kind: EntityKind, id: i64) -> Result<Value, AppError> {
        let graph = self.store.begin(None).await?;
        item_view(&graph, EntityRef::new(kind, id))
    }

    pub async fn create(&self, kind: EntityKind, actor: &Actor, body: Value) -> Result<Value, AppError> {
        let mut graph = self.store.begin(Some(actor.username.clone())).await?;

        // 1. Só as chaves graváveis
        let body = views::writable(kind, views::contexts(kind).write, body);

        // 2. Cria e aplica o payload (relações pelo protocolo add/remove)
        let id = with_resource!(kind, R => write::<R>(&mut graph, None, body))?;
        let entity = EntityRef::new(kind, id);

        // 3. Valida, faz o hash de senha pendente e grava
        self.finish(&mut graph, entity).await?;
        item_view(&graph, entity)
    }

    pub async fn update(&self, kind: EntityKind, actor: &Actor, id: i64, body: Value) -> Result<Value, AppError> {
        let mut graph = self.store.begin(Some(actor.username.clone())).await?;
        let entity = EntityRef::new(kind, id);
        require(&graph, entity)?;

        let body = views::writable(kind, views::contexts(kind).write, body);
        with_resource!(kind, R => write::<R>(&mut graph, Some(id), body))?;

        self.finish(&mut graph, entity).await?;
        item_view(&graph, entity)
    }

    pub async fn delete(&self, kind: EntityKind, actor: &Actor, id: i64) -> Result<(), AppError> {
        let mut graph = self.store.begin(Some(actor.username.clone())).await?;
        let entity = EntityRef::new(kind, id);
        require(&graph, entity)?;

        graph.delete_ref(entity)?;
        self.store.flush(&mut graph).await?;
        tracing::info!("{} removido por {}", entity, actor.username);
        Ok(())
    }

    async fn finish(&self, graph: &mut EntityGraph, entity: EntityRef) -> Result<(), AppError> {
        validation::validate(graph, entity, validation::DEFAULT)?;
        self.auth_service.hash_pending_passwords(graph).await?;
        self.store.flush(graph).await?;
        Ok(())
    }
}

fn require(graph: &EntityGraph, entity: EntityRef) -> Result<(), AppError> {
    if graph.snapshot(entity).is_some() {
        Ok(())
    } else {
        Err(AppError::NotFound {
            resource: entity.kind.slug(),
            id: entity.id,
        })
    }
}

fn item_view(graph: &EntityGraph, entity: EntityRef) -> Result<Value, AppError> {
    require(graph, entity)?;
    views::project(graph, entity, views::contexts(entity.kind).item).ok_or(AppError::NotFound {
        resource: entity.kind.slug(),
        id: entity.id,
    })
}

// Decodifica o payload no `Input` do tipo e aplica (criando se `id` é None).
fn write<R: Writable>(graph: &mut EntityGraph, id: Option<i64>, body: Value) -> Result<i64, AppError> {
    let input: R::Input = serde_json::from_value(body).map_err(AppError::InvalidPayload)?;
    let id = match id {
        Some(raw) => {
            let id = EntityId::<R>::new(raw);
            R::apply(graph, id, input)?;
            id
        }
        None => R::create(graph, input)?,
    };
    Ok(id.get())
}
