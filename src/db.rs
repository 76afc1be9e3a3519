// src/db.rs

// Persistência do grafo. O `GraphStore` abre unidades de trabalho e faz o
// flush transacional (entidades + histórico juntos).

pub mod audit;
pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    graph::{ChangeSet, EntityGraph},
    models::{History, HistoryEntry},
};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Abre uma unidade de trabalho com o grafo carregado.
    async fn begin(&self, actor: Option<String>) -> Result<EntityGraph, AppError>;

    /// Grava as mudanças pendentes e o histórico numa transação só.
    /// Em caso de erro nada é gravado.
    async fn flush(&self, graph: &mut EntityGraph) -> Result<FlushReport, AppError>;

    async fn histories(&self) -> Result<Vec<History>, AppError>;

    async fn find_history(&self, id: i64) -> Result<Option<History>, AppError>;

    async fn histories_for(&self, object_class: &str, object_id: &str) -> Result<Vec<History>, AppError>;
}

#[derive(Debug, Default)]
pub struct FlushReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub histories: Vec<History>,
}

pub(crate) struct PreparedFlush {
    pub changes: ChangeSet,
    pub entries: Vec<HistoryEntry>,
}

impl PreparedFlush {
    pub fn report(&self, histories: Vec<History>) -> FlushReport {
        FlushReport {
            created: self.changes.created.len(),
            updated: self.changes.updated.len(),
            removed: self.changes.removed.len(),
            histories,
        }
    }
}

/// Passos comuns a todo store antes de gravar:
/// 1. órfãos sem novo dono são apagados
/// 2. `updatedAt/updatedBy` nas entidades que mudaram de verdade
/// 3. fotografia das mudanças + rascunhos do histórico
pub(crate) fn prepare_flush(graph: &mut EntityGraph) -> Result<PreparedFlush, AppError> {
    graph.remove_orphans()?;
    graph.stamp_updates();
    let changes = graph.change_set();
    let entries = audit::entries(graph, &changes);
    Ok(PreparedFlush { changes, entries })
}
