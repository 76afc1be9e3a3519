// src/models/mod.rs

pub mod auth;
pub mod client;
pub mod history;
pub mod mixins;
pub mod project;
pub mod rbac;
pub mod reference;

pub use client::{Address, Client, Contact};
pub use history::{AuditAction, History, HistoryEntry};
pub use project::{Document, Project};
pub use rbac::{Module, Role};
pub use reference::{ContactType, Country, File, Label, Language, ProjectType};

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::{
    common::error::AppError,
    graph::{EntityGraph, EntityId, Resource},
};

/// Recurso que aceita escrita pela API genérica (POST/PUT).
///
/// `Input` já chega filtrado pelos grupos de escrita; campos ausentes
/// (`None`) ficam como estão.
pub trait Writable: Resource {
    type Input: DeserializeOwned + Send;

    fn blank() -> Self;

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: Self::Input) -> Result<(), AppError>;

    fn create(graph: &mut EntityGraph, input: Self::Input) -> Result<EntityId<Self>, AppError> {
        let id = graph.persist(Self::blank());
        Self::apply(graph, id, input)?;
        Ok(id)
    }
}

/// Campo anulável do payload: ausente = `None`, `null` = `Some(None)`.
/// Usar com `#[serde(default, deserialize_with = "super::nullable")]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
