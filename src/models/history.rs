// src/models/history.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Ação auditada. Gravada como texto curto (`create`, `update`, `remove`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Remove,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Remove => "remove",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Ação de auditoria desconhecida: {0}")]
pub struct UnknownAction(String);

impl TryFrom<String> for AuditAction {
    type Error = UnknownAction;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "remove" => Ok(AuditAction::Remove),
            _ => Err(UnknownAction(value)),
        }
    }
}

// Registro imutável do histórico (tabela `histories`).
// Não há setters: o registro nasce completo em `HistoryEntry::into_history`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct History {
    id: i64,
    #[sqlx(try_from = "String")]
    action: AuditAction,
    logged_at: DateTime<Utc>,
    object_id: Option<String>,
    object_class: String,
    version: i32,
    data: Option<Value>,
    username: Option<String>,
}

impl History {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn logged_at(&self) -> DateTime<Utc> {
        self.logged_at
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Rascunho de um registro: tudo menos o que só o escritor sabe
/// (id, versão e instante do log).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub action: AuditAction,
    pub object_class: &'static str,
    pub object_id: String,
    pub data: Option<Value>,
    pub username: Option<String>,
}

impl HistoryEntry {
    pub fn into_history(self, id: i64, version: i32, logged_at: DateTime<Utc>) -> History {
        History {
            id,
            action: self.action,
            logged_at,
            object_id: Some(self.object_id),
            object_class: self.object_class.to_string(),
            version,
            data: self.data,
            username: self.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_its_column_text() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Remove] {
            assert_eq!(AuditAction::try_from(action.as_str().to_string()).unwrap(), action);
            assert!(action.as_str().len() <= 8);
        }
        assert!(AuditAction::try_from("delete".to_string()).is_err());
    }

    #[test]
    fn history_serializes_with_camel_case_names() {
        let entry = HistoryEntry {
            action: AuditAction::Create,
            object_class: "backoffice::models::client::Client",
            object_id: "7".into(),
            data: Some(serde_json::json!({"name": "Ana"})),
            username: Some("admin".into()),
        };
        let history = entry.into_history(1, 1, Utc::now());
        let value = serde_json::to_value(&history).unwrap();

        assert_eq!(value["action"], "create");
        assert_eq!(value["objectId"], "7");
        assert_eq!(value["objectClass"], "backoffice::models::client::Client");
        assert_eq!(value["version"], 1);
        assert!(value.get("loggedAt").is_some());
    }
}
