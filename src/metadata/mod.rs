// src/metadata/mod.rs

// Tabelas declarativas por entidade: grupos de serialização, regras de
// validação e filtros de coleção. A API genérica só consome essas tabelas.

pub mod filters;
pub mod validation;
pub mod views;

pub use filters::{CollectionQuery, Page};
