// src/services/history_service.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::error::AppError,
    db::GraphStore,
    graph::EntityKind,
    metadata::{filters, CollectionQuery, Page},
    models::History,
};

// Leitura do histórico. Não existe escrita por aqui: quem grava é o flush.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn GraphStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &[(String, String)]) -> Result<Page<Value>, AppError> {
        let records = self.store.histories().await?;
        Ok(paginate(records, query))
    }

    pub async fn show(&self, id: i64) -> Result<History, AppError> {
        self.store
            .find_history(id)
            .await?
            .ok_or(AppError::NotFound { resource: "history", id })
    }

    /// `entity` aceita o slug, a coleção ou o nome do tipo ("client",
    /// "clients", "Client").
    pub async fn for_entity(&self, entity: &str, entity_id: &str, query: &[(String, String)]) -> Result<Page<Value>, AppError> {
        let kind = EntityKind::from_slug(entity).ok_or_else(|| AppError::UnknownResource(entity.to_string()))?;
        let records = self.store.histories_for(kind.object_class(), entity_id).await?;
        Ok(paginate(records, query))
    }
}

fn paginate(records: Vec<History>, query: &[(String, String)]) -> Page<Value> {
    let rows: Vec<Value> = records
        .iter()
        .filter_map(|history| serde_json::to_value(history).ok())
        .collect();
    let query = CollectionQuery::parse(&filters::HISTORY, query);
    query.apply(rows, |row, path| row.get(path).cloned().into_iter().collect())
}
