// src/db/pg_store.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::{prepare_flush, FlushReport, GraphStore},
    graph::{EntityGraph, EntityKind, EntityRef, Sequences, UniqueConstraint},
    models::{History, HistoryEntry},
};

// Cada entidade é uma linha (kind, id, body JSONB). Unicidade garantida
// por índices parciais sobre o body (ver migrations/).
//
// As sequências de ID ficam em memória e são alinhadas a cada carga:
// um processo por banco.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    sequences: Arc<Sequences>,
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    kind: String,
    id: i64,
    body: Value,
}

const HISTORY_COLUMNS: &str =
    "id, action, logged_at, object_id, object_class, version, data, username";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            sequences: Arc::new(Sequences::default()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write_rows(
        tx: &mut Transaction<'_, Postgres>,
        graph: &EntityGraph,
        rows: impl Iterator<Item = EntityRef>,
        sql: &str,
    ) -> Result<(), AppError> {
        for entity in rows {
            let Some(body) = graph.stored_value(entity) else {
                continue;
            };
            sqlx::query(sql)
                .bind(entity.kind.slug())
                .bind(entity.id)
                .bind(body)
                .execute(&mut **tx)
                .await
                .map_err(map_unique_violation)?;
        }
        Ok(())
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        entry: HistoryEntry,
        logged_at: chrono::DateTime<Utc>,
    ) -> Result<History, AppError> {
        // A versão sai da própria tabela: última + 1.
        let sql = format!(
            r#"
            INSERT INTO histories (action, logged_at, object_id, object_class, version, data, username)
            VALUES (
                $1, $2, $3, $4,
                (SELECT COALESCE(MAX(version), 0) + 1 FROM histories WHERE object_class = $4 AND object_id = $3),
                $5, $6
            )
            RETURNING {}
            "#,
            HISTORY_COLUMNS
        );
        let history = sqlx::query_as::<_, History>(&sql)
            .bind(entry.action.as_str())
            .bind(logged_at)
            .bind(entry.object_id)
            .bind(entry.object_class)
            .bind(entry.data)
            .bind(entry.username)
            .fetch_one(&mut **tx)
            .await?;
        Ok(history)
    }
}

// Violação de índice único vira o 409 da restrição correspondente.
fn map_unique_violation(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint().and_then(UniqueConstraint::by_index) {
                return constraint.violation();
            }
        }
    }
    AppError::DatabaseError(error)
}

#[async_trait]
impl GraphStore for PgStore {
    async fn begin(&self, actor: Option<String>) -> Result<EntityGraph, AppError> {
        let rows = sqlx::query_as::<_, EntityRow>("SELECT kind, id, body FROM entities ORDER BY kind, id")
            .fetch_all(&self.pool)
            .await?;

        let mut graph = EntityGraph::with_sequences(Arc::clone(&self.sequences));
        for row in rows {
            let kind = EntityKind::from_slug(&row.kind)
                .ok_or_else(|| anyhow::anyhow!("Tipo de entidade desconhecido no banco: {}", row.kind))?;
            graph.load_value(kind, row.id, row.body)?;
        }
        graph.rebuild_inverse_sides();
        Ok(graph.fork(actor))
    }

    async fn flush(&self, graph: &mut EntityGraph) -> Result<FlushReport, AppError> {
        let prepared = prepare_flush(graph)?;
        if prepared.changes.is_empty() {
            graph.commit_changes();
            return Ok(FlushReport::default());
        }

        let mut tx = self.pool.begin().await?;

        // 1. Remoções primeiro (libera valores únicos reaproveitados no mesmo flush)
        for entity in &prepared.changes.removed {
            sqlx::query("DELETE FROM entities WHERE kind = $1 AND id = $2")
                .bind(entity.kind.slug())
                .bind(entity.id)
                .execute(&mut *tx)
                .await?;
        }

        // 2. Atualizações e inserções
        let updated = prepared.changes.updated.iter().map(|(entity, _)| *entity);
        Self::write_rows(
            &mut tx,
            graph,
            updated,
            "UPDATE entities SET body = $3 WHERE kind = $1 AND id = $2",
        )
        .await?;
        Self::write_rows(
            &mut tx,
            graph,
            prepared.changes.created.iter().copied(),
            "INSERT INTO entities (kind, id, body) VALUES ($1, $2, $3)",
        )
        .await?;

        // 3. Histórico, na mesma transação
        let logged_at = Utc::now();
        let mut histories = Vec::with_capacity(prepared.entries.len());
        for entry in prepared.entries.iter().cloned() {
            histories.push(Self::insert_history(&mut tx, entry, logged_at).await?);
        }

        // Se qualquer passo acima falhou, o `tx` faz rollback ao sair do escopo.
        tx.commit().await?;

        graph.commit_changes();
        let report = prepared.report(histories);
        tracing::info!(
            "Flush: {} criadas, {} atualizadas, {} removidas, {} registros de histórico",
            report.created,
            report.updated,
            report.removed,
            report.histories.len()
        );
        Ok(report)
    }

    async fn histories(&self) -> Result<Vec<History>, AppError> {
        let sql = format!("SELECT {} FROM histories ORDER BY id", HISTORY_COLUMNS);
        Ok(sqlx::query_as::<_, History>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_history(&self, id: i64) -> Result<Option<History>, AppError> {
        let sql = format!("SELECT {} FROM histories WHERE id = $1", HISTORY_COLUMNS);
        Ok(sqlx::query_as::<_, History>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn histories_for(&self, object_class: &str, object_id: &str) -> Result<Vec<History>, AppError> {
        let sql = format!(
            "SELECT {} FROM histories WHERE object_class = $1 AND object_id = $2 ORDER BY id",
            HISTORY_COLUMNS
        );
        Ok(sqlx::query_as::<_, History>(&sql)
            .bind(object_class)
            .bind(object_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
