// src/graph/id.rs

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicI64};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::graph::kind::EntityKind;

/// Identidade inteira de uma entidade, tipada pelo tipo da entidade.
///
/// `EntityId<Client>` e `EntityId<Project>` não se misturam, mesmo que o
/// valor numérico seja igual. No fio (JSON) e no banco é só um número.
pub struct EntityId<T> {
    raw: i64,
    kind: PhantomData<fn() -> T>,
}

impl<T> EntityId<T> {
    pub const fn new(raw: i64) -> Self {
        Self {
            raw,
            kind: PhantomData,
        }
    }

    pub const fn get(self) -> i64 {
        self.raw
    }
}

// As implementações são manuais para não exigir `T: Clone`, `T: Eq` etc.
impl<T> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityId<T> {}

impl<T> PartialEq for EntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for EntityId<T> {}

impl<T> PartialOrd for EntityId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for EntityId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for EntityId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T> From<EntityId<T>> for i64 {
    fn from(id: EntityId<T>) -> Self {
        id.raw
    }
}

impl<T> Serialize for EntityId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.raw)
    }
}

impl<'de, T> Deserialize<'de> for EntityId<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

// ---
// Sequências de ID
// ---
// Uma sequência por tipo de entidade, compartilhada (via Arc) por todas as
// unidades de trabalho abertas contra o mesmo store. Funciona como as
// sequences do Postgres: um ID nunca é reutilizado, mesmo após rollback.
#[derive(Debug, Default)]
pub struct Sequences {
    counters: [AtomicI64; EntityKind::COUNT],
}

impl Sequences {
    pub fn next(&self, kind: EntityKind) -> i64 {
        self.counters[kind.index()].fetch_add(1, atomic::Ordering::SeqCst) + 1
    }

    /// Garante que os próximos IDs fiquem acima de um ID já existente.
    pub fn observe(&self, kind: EntityKind, id: i64) {
        self.counters[kind.index()].fetch_max(id, atomic::Ordering::SeqCst);
    }

    pub fn current(&self, kind: EntityKind) -> i64 {
        self.counters[kind.index()].load(atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let id = EntityId::<Dummy>::new(42);
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(42));
        let back: EntityId<Dummy> = serde_json::from_value(serde_json::json!(42)).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn sequences_are_per_kind_and_skip_observed_ids() {
        let sequences = Sequences::default();
        assert_eq!(sequences.next(EntityKind::Client), 1);
        assert_eq!(sequences.next(EntityKind::Client), 2);
        assert_eq!(sequences.next(EntityKind::Project), 1);

        sequences.observe(EntityKind::Client, 10);
        assert_eq!(sequences.next(EntityKind::Client), 11);

        // Observar um ID menor não faz a sequência voltar.
        sequences.observe(EntityKind::Client, 3);
        assert_eq!(sequences.current(EntityKind::Client), 11);
    }
}
