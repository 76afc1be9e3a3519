// src/graph/arena.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::graph::id::EntityId;

/// Armazém de entidades de um tipo, indexado pela identidade.
///
/// A ordem de iteração é a ordem dos IDs, então listagens e cascatas são
/// determinísticas.
pub struct Arena<T> {
    items: BTreeMap<EntityId<T>, T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: EntityId<T>, item: T) -> Option<T> {
        self.items.insert(id, item)
    }

    pub fn get(&self, id: EntityId<T>) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId<T>) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId<T>) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn contains(&self, id: EntityId<T>) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId<T>, &T)> {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId<T>, &mut T)> {
        self.items.iter_mut().map(|(id, item)| (*id, item))
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId<T>> + '_ {
        self.items.keys().copied()
    }

    /// IDs que satisfazem o predicado (útil para cascatas).
    pub fn ids_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<EntityId<T>> {
        self.items
            .iter()
            .filter(|(_, item)| predicate(item))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Arena<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items.iter()).finish()
    }
}

/// Conjunto ordenado (por inserção) de IDs, sem duplicatas.
///
/// É a representação das coleções das entidades (`Client.projects`,
/// `Project.documents` etc.).
pub struct IdSet<T> {
    ids: Vec<EntityId<T>>,
}

impl<T> IdSet<T> {
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Retorna `false` se o ID já estava presente.
    pub fn insert(&mut self, id: EntityId<T>) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Retorna `false` se o ID não estava presente.
    pub fn remove(&mut self, id: EntityId<T>) -> bool {
        match self.ids.iter().position(|current| *current == id) {
            Some(position) => {
                self.ids.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId<T>) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId<T>> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<EntityId<T>> {
        self.ids.clone()
    }
}

impl<T> Default for IdSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for IdSet<T> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
        }
    }
}

impl<T> PartialEq for IdSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl<T> Eq for IdSet<T> {}

impl<T> fmt::Debug for IdSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids.iter()).finish()
    }
}

impl<T> FromIterator<EntityId<T>> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = EntityId<T>>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<T> Serialize for IdSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ids.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for IdSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<EntityId<T>>::deserialize(deserializer)?;
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    fn id(raw: i64) -> EntityId<Dummy> {
        EntityId::new(raw)
    }

    #[test]
    fn id_set_rejects_duplicates_and_keeps_insertion_order() {
        let mut set = IdSet::new();
        assert!(set.insert(id(3)));
        assert!(set.insert(id(1)));
        assert!(!set.insert(id(3)));
        assert_eq!(set.to_vec(), vec![id(3), id(1)]);

        assert!(set.remove(id(3)));
        assert!(!set.remove(id(3)));
        assert_eq!(set.to_vec(), vec![id(1)]);
    }

    #[test]
    fn id_set_deserialization_drops_duplicates() {
        let set: IdSet<Dummy> = serde_json::from_str("[5, 2, 5]").unwrap();
        assert_eq!(set.to_vec(), vec![id(5), id(2)]);
    }

    #[test]
    fn arena_iterates_in_id_order() {
        let id = |raw: i64| EntityId::<&'static str>::new(raw);
        let mut arena = Arena::new();
        arena.insert(id(9), "nove");
        arena.insert(id(2), "dois");
        let ids: Vec<_> = arena.ids().collect();
        assert_eq!(ids, vec![id(2), id(9)]);
        assert_eq!(arena.ids_where(|value| value.starts_with('n')), vec![id(9)]);
    }
}
