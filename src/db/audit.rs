// src/db/audit.rs

// =========================================================================
//  ESCRITOR DE HISTÓRICO
// =========================================================================
//
// Transforma o `ChangeSet` de um flush em rascunhos de `History`:
//   create -> snapshot completo
//   update -> só os campos alterados (valores novos)
//   remove -> sem dados
// A versão (última + 1) e o instante do log são atribuídos por quem grava.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::graph::tracker::diff;
use crate::graph::{ChangeSet, EntityGraph};
use crate::models::{AuditAction, History, HistoryEntry};

// Nunca entram no histórico.
const CREDENTIAL_FIELDS: [&str; 3] = ["password", "token", "tokenCreatedAt"];

pub fn entries(graph: &EntityGraph, changes: &ChangeSet) -> Vec<HistoryEntry> {
    let username = graph.actor().map(str::to_string);
    let mut entries = Vec::new();

    for entity in &changes.created {
        let Some(snapshot) = graph.snapshot(*entity) else {
            continue;
        };
        entries.push(HistoryEntry {
            action: AuditAction::Create,
            object_class: entity.kind.object_class(),
            object_id: entity.id.to_string(),
            data: Some(Value::Object(strip_credentials(into_map(snapshot)))),
            username: username.clone(),
        });
    }

    for (entity, before) in &changes.updated {
        let Some(after) = graph.stored_value(*entity) else {
            continue;
        };
        // Diff antes de limpar: trocar só a senha ainda gera um registro.
        let changed = diff(before, &after);
        if changed.is_empty() {
            continue;
        }
        entries.push(HistoryEntry {
            action: AuditAction::Update,
            object_class: entity.kind.object_class(),
            object_id: entity.id.to_string(),
            data: Some(Value::Object(strip_credentials(changed))),
            username: username.clone(),
        });
    }

    for entity in &changes.removed {
        entries.push(HistoryEntry {
            action: AuditAction::Remove,
            object_class: entity.kind.object_class(),
            object_id: entity.id.to_string(),
            data: None,
            username: username.clone(),
        });
    }

    entries
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn strip_credentials(mut data: Map<String, Value>) -> Map<String, Value> {
    for field in CREDENTIAL_FIELDS {
        data.remove(field);
    }
    data
}

// ---
// Log em memória (usado pelo MemoryStore)
// ---

/// Histórico só-de-acréscimo. Versão por `(objectClass, objectId)` e
/// `loggedAt` nunca decrescente.
#[derive(Debug, Default, Clone)]
pub struct HistoryLog {
    records: Vec<History>,
    versions: HashMap<(String, String), i32>,
}

impl HistoryLog {
    pub fn append(&mut self, entries: Vec<HistoryEntry>, now: DateTime<Utc>) -> Vec<History> {
        let logged_at = match self.records.last() {
            Some(last) if last.logged_at() > now => last.logged_at(),
            _ => now,
        };

        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = (entry.object_class.to_string(), entry.object_id.clone());
            let version = self.versions.get(&key).copied().unwrap_or(0) + 1;
            self.versions.insert(key, version);

            let id = self.records.len() as i64 + 1;
            let history = entry.into_history(id, version, logged_at);
            self.records.push(history.clone());
            written.push(history);
        }
        written
    }

    pub fn all(&self) -> &[History] {
        &self.records
    }

    pub fn find(&self, id: i64) -> Option<&History> {
        self.records.iter().find(|history| history.id() == id)
    }

    pub fn for_object(&self, object_class: &str, object_id: &str) -> Vec<History> {
        self.records
            .iter()
            .filter(|h| h.object_class() == object_class && h.object_id() == Some(object_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityKind;
    use crate::models::{Client, Label};
    use serde_json::json;

    #[test]
    fn create_snapshot_never_carries_credentials() {
        let mut graph = EntityGraph::new().fork(Some("admin".into()));
        let client = graph.persist(Client::new("Ana", "ana@example.com"));
        graph
            .update(client, |c| c.set_token(Some("reset".into()), Utc::now()))
            .unwrap();

        let entries = entries(&graph, &graph.change_set());
        assert_eq!(entries.len(), 1);
        let data = entries[0].data.as_ref().unwrap();
        assert_eq!(data["username"], "ana@example.com");
        for field in CREDENTIAL_FIELDS {
            assert!(data.get(field).is_none(), "{} vazou", field);
        }
        assert_eq!(entries[0].username.as_deref(), Some("admin"));
        assert!(entries[0].object_class.ends_with("::Client"));
    }

    #[test]
    fn password_only_update_is_recorded_with_empty_data() {
        let mut graph = EntityGraph::new();
        let client = graph.persist(Client::new("Ana", "ana@example.com"));
        graph.commit_changes();

        graph.update(client, |c| c.set_password("novo-hash".into())).unwrap();
        graph.stamp_updates();

        let entries = entries(&graph, &graph.change_set());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Update);
        assert_eq!(entries[0].data, Some(json!({})));
    }

    #[test]
    fn versions_grow_per_object_and_time_never_goes_back() {
        let mut log = HistoryLog::default();
        let entry = |id: &str| HistoryEntry {
            action: AuditAction::Update,
            object_class: EntityKind::Label.object_class(),
            object_id: id.to_string(),
            data: None,
            username: None,
        };

        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(10);
        log.append(vec![entry("1"), entry("2")], later);
        let second = log.append(vec![entry("1")], earlier);

        assert_eq!(second[0].version(), 2);
        assert_eq!(second[0].logged_at(), later);
        assert_eq!(log.for_object(EntityKind::Label.object_class(), "2")[0].version(), 1);
        assert_eq!(log.find(3).map(History::version), Some(2));
    }

    #[test]
    fn removal_has_no_data() {
        let mut graph = EntityGraph::new();
        let label = graph.persist(Label::new("vip"));
        graph.commit_changes();
        graph.delete(label).unwrap();

        let entries = entries(&graph, &graph.change_set());
        assert_eq!(entries[0].action, AuditAction::Remove);
        assert_eq!(entries[0].data, None);
        assert_eq!(entries[0].object_id, "1");
    }
}
