// src/db/memory_store.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    common::error::AppError,
    db::{audit::HistoryLog, prepare_flush, FlushReport, GraphStore},
    graph::EntityGraph,
    models::{ContactType, History},
};

// Mesma carga inicial da migração: PHONE=1, EMAIL=2, WWW=3.
const CONTACT_TYPES: [&str; 3] = ["Phone", "E-mail", "WWW"];

// Store em memória: um grafo "canônico" + o log de histórico.
// Os flushes são serializados pelo mutex.
pub struct MemoryStore {
    state: Mutex<State>,
}

struct State {
    graph: EntityGraph,
    log: HistoryLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut graph = EntityGraph::new();
        for name in CONTACT_TYPES {
            graph.persist(ContactType::new(name));
        }
        graph.commit_changes();

        Self {
            state: Mutex::new(State {
                graph,
                log: HistoryLog::default(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn begin(&self, actor: Option<String>) -> Result<EntityGraph, AppError> {
        let state = self.state.lock().await;
        Ok(state.graph.fork(actor))
    }

    async fn flush(&self, graph: &mut EntityGraph) -> Result<FlushReport, AppError> {
        let prepared = prepare_flush(graph)?;
        if prepared.changes.is_empty() {
            graph.commit_changes();
            return Ok(FlushReport::default());
        }

        let mut state = self.state.lock().await;

        // Aplica numa cópia: se a unicidade falhar, o estado fica intacto.
        let mut next = state.graph.clone();
        next.absorb(graph, &prepared.changes);
        next.check_unique_constraints()?;

        let histories = state.log.append(prepared.entries.clone(), Utc::now());
        state.graph = next;
        drop(state);

        graph.commit_changes();
        let report = prepared.report(histories);
        tracing::info!(
            "Flush: {} criadas, {} atualizadas, {} removidas",
            report.created,
            report.updated,
            report.removed
        );
        Ok(report)
    }

    async fn histories(&self) -> Result<Vec<History>, AppError> {
        Ok(self.state.lock().await.log.all().to_vec())
    }

    async fn find_history(&self, id: i64) -> Result<Option<History>, AppError> {
        Ok(self.state.lock().await.log.find(id).cloned())
    }

    async fn histories_for(&self, object_class: &str, object_id: &str) -> Result<Vec<History>, AppError> {
        Ok(self.state.lock().await.log.for_object(object_class, object_id))
    }
}
