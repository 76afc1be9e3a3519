// src/graph/tracker.rs

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::graph::kind::EntityRef;
use crate::models::mixins::Stamps;

/// O que a unidade de trabalho mudou desde que foi aberta (ou desde o último
/// flush bem-sucedido).
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    created: BTreeSet<EntityRef>,
    // Imagem "antes" de cada entidade carregada que foi tocada.
    before: BTreeMap<EntityRef, Value>,
    removed: BTreeSet<EntityRef>,
    // Filhos desligados de uma relação com orphan removal.
    orphans: BTreeSet<EntityRef>,
}

impl ChangeTracker {
    pub fn record_created(&mut self, entity: EntityRef) {
        self.created.insert(entity);
    }

    /// Precisamos guardar a imagem "antes"? (só na primeira vez, e nunca para
    /// entidades criadas nesta sessão)
    pub fn wants_before(&self, entity: &EntityRef) -> bool {
        !self.created.contains(entity) && !self.before.contains_key(entity)
    }

    pub fn record_before(&mut self, entity: EntityRef, image: Value) {
        self.before.entry(entity).or_insert(image);
    }

    pub fn record_removed(&mut self, entity: EntityRef) {
        self.orphans.remove(&entity);
        // Criada e apagada na mesma sessão: nunca existiu para o store.
        if self.created.remove(&entity) {
            return;
        }
        self.before.remove(&entity);
        self.removed.insert(entity);
    }

    pub fn mark_orphan(&mut self, entity: EntityRef) {
        self.orphans.insert(entity);
    }

    pub fn unmark_orphan(&mut self, entity: &EntityRef) {
        self.orphans.remove(entity);
    }

    pub fn take_orphans(&mut self) -> Vec<EntityRef> {
        std::mem::take(&mut self.orphans).into_iter().collect()
    }

    /// Descarta uma imagem "antes" que se revelou idêntica ao estado atual.
    pub fn forget_before(&mut self, entity: &EntityRef) {
        self.before.remove(entity);
    }

    pub fn before_image(&self, entity: &EntityRef) -> Option<&Value> {
        self.before.get(entity)
    }

    pub fn touched(&self) -> impl Iterator<Item = (&EntityRef, &Value)> {
        self.before.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.before.is_empty() && self.removed.is_empty()
    }

    pub fn change_set(&self) -> ChangeSet {
        ChangeSet {
            created: self.created.iter().copied().collect(),
            updated: self
                .before
                .iter()
                .map(|(entity, image)| (*entity, image.clone()))
                .collect(),
            removed: self.removed.iter().copied().collect(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Fotografia das mudanças entregue ao store no flush.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub created: Vec<EntityRef>,
    /// Entidade + imagem "antes" (corpo persistido na abertura da sessão).
    pub updated: Vec<(EntityRef, Value)>,
    pub removed: Vec<EntityRef>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Criadas + atualizadas: as linhas que precisam ser gravadas.
    pub fn written(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.created
            .iter()
            .copied()
            .chain(self.updated.iter().map(|(entity, _)| *entity))
    }
}

/// Campos cujo valor mudou entre duas imagens (novos valores), ignorando
/// os carimbos de auditoria.
pub fn diff(before: &Value, after: &Value) -> Map<String, Value> {
    let empty = Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let mut changed = Map::new();
    for (field, value) in after {
        if Stamps::FIELDS.contains(&field.as_str()) {
            continue;
        }
        if before.get(field) != Some(value) {
            changed.insert(field.clone(), value.clone());
        }
    }
    // Campo que sumiu (ex: Option serializado como ausente) vira null.
    for field in before.keys() {
        if !after.contains_key(field) && !Stamps::FIELDS.contains(&field.as_str()) {
            changed.insert(field.clone(), Value::Null);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::kind::EntityKind;
    use serde_json::json;

    fn client(id: i64) -> EntityRef {
        EntityRef::new(EntityKind::Client, id)
    }

    #[test]
    fn diff_ignores_stamps_and_reports_new_values() {
        let before = json!({"name": "Ana", "updatedAt": "2024-01-01T00:00:00Z", "city": "Recife"});
        let after = json!({"name": "Bia", "updatedAt": "2024-02-01T00:00:00Z", "city": "Recife"});

        let changed = diff(&before, &after);
        assert_eq!(Value::Object(changed), json!({"name": "Bia"}));
    }

    #[test]
    fn first_before_image_wins() {
        let mut tracker = ChangeTracker::default();
        tracker.record_before(client(1), json!({"name": "antes"}));
        tracker.record_before(client(1), json!({"name": "depois"}));

        let changes = tracker.change_set();
        assert_eq!(changes.updated, vec![(client(1), json!({"name": "antes"}))]);
        assert!(!tracker.wants_before(&client(1)));
    }

    #[test]
    fn removing_a_fresh_entity_leaves_no_trace() {
        let mut tracker = ChangeTracker::default();
        tracker.record_created(client(5));
        tracker.mark_orphan(client(5));
        tracker.record_removed(client(5));

        assert!(tracker.is_empty());
        assert!(tracker.take_orphans().is_empty());
    }

    #[test]
    fn removing_a_loaded_entity_drops_its_update() {
        let mut tracker = ChangeTracker::default();
        tracker.record_before(client(2), json!({}));
        tracker.record_removed(client(2));

        let changes = tracker.change_set();
        assert!(changes.updated.is_empty());
        assert_eq!(changes.removed, vec![client(2)]);
    }
}
