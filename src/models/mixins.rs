// src/models/mixins.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Campos de auditoria embutidos em todas as entidades (exceto History).
// Nomes iguais aos da API: createdAt, updatedAt, createdBy, updatedBy, isActive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamps {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl Default for Stamps {
    fn default() -> Self {
        Self {
            created_at: None,
            updated_at: None,
            created_by: None,
            updated_by: None,
            is_active: true,
        }
    }
}

impl Stamps {
    /// Nomes (no fio) dos campos que não contam como mudança de negócio.
    pub const FIELDS: [&'static str; 4] = ["createdAt", "updatedAt", "createdBy", "updatedBy"];

    pub fn stamp_created(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self.created_by = actor.map(str::to_owned);
        self.updated_by = actor.map(str::to_owned);
    }

    pub fn stamp_updated(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = Some(now);
        self.updated_by = actor.map(str::to_owned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_the_creation_stamps() {
        let mut stamps = Stamps::default();
        let created = Utc::now();
        stamps.stamp_created(Some("ana"), created);

        let later = created + chrono::Duration::seconds(30);
        stamps.stamp_updated(None, later);

        assert_eq!(stamps.created_at, Some(created));
        assert_eq!(stamps.created_by.as_deref(), Some("ana"));
        assert_eq!(stamps.updated_at, Some(later));
        assert_eq!(stamps.updated_by, None);
        assert!(stamps.is_active);
    }

    #[test]
    fn missing_is_active_deserializes_as_true() {
        let stamps: Stamps = serde_json::from_str("{}").unwrap();
        assert!(stamps.is_active);
    }
}
