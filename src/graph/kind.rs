// src/graph/kind.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::id::EntityId;

// Executa `$body` com `$r` apontando para o tipo concreto do `EntityKind`.
macro_rules! with_resource {
    ($kind:expr, $r:ident => $body:expr) => {
        match $kind {
            $crate::graph::EntityKind::Country => {
                type $r = $crate::models::Country;
                $body
            }
            $crate::graph::EntityKind::Language => {
                type $r = $crate::models::Language;
                $body
            }
            $crate::graph::EntityKind::Label => {
                type $r = $crate::models::Label;
                $body
            }
            $crate::graph::EntityKind::ContactType => {
                type $r = $crate::models::ContactType;
                $body
            }
            $crate::graph::EntityKind::ProjectType => {
                type $r = $crate::models::ProjectType;
                $body
            }
            $crate::graph::EntityKind::File => {
                type $r = $crate::models::File;
                $body
            }
            $crate::graph::EntityKind::Module => {
                type $r = $crate::models::Module;
                $body
            }
            $crate::graph::EntityKind::Role => {
                type $r = $crate::models::Role;
                $body
            }
            $crate::graph::EntityKind::Client => {
                type $r = $crate::models::Client;
                $body
            }
            $crate::graph::EntityKind::Contact => {
                type $r = $crate::models::Contact;
                $body
            }
            $crate::graph::EntityKind::Address => {
                type $r = $crate::models::Address;
                $body
            }
            $crate::graph::EntityKind::Project => {
                type $r = $crate::models::Project;
                $body
            }
            $crate::graph::EntityKind::Document => {
                type $r = $crate::models::Document;
                $body
            }
        }
    };
}

pub(crate) use with_resource;

// ---
// Tipos de entidade conhecidos pelo grafo
// ---
// A ordem das variantes define o índice das sequências de ID (não reordenar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    Language,
    Label,
    ContactType,
    ProjectType,
    File,
    Module,
    Role,
    Client,
    Contact,
    Address,
    Project,
    Document,
}

impl EntityKind {
    pub const COUNT: usize = 13;

    pub const ALL: [EntityKind; Self::COUNT] = [
        EntityKind::Country,
        EntityKind::Language,
        EntityKind::Label,
        EntityKind::ContactType,
        EntityKind::ProjectType,
        EntityKind::File,
        EntityKind::Module,
        EntityKind::Role,
        EntityKind::Client,
        EntityKind::Contact,
        EntityKind::Address,
        EntityKind::Project,
        EntityKind::Document,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Nome curto usado na coluna `kind` do banco e na rota de histórico.
    pub fn slug(self) -> &'static str {
        match self {
            EntityKind::Country => "country",
            EntityKind::Language => "language",
            EntityKind::Label => "label",
            EntityKind::ContactType => "contact_type",
            EntityKind::ProjectType => "project_type",
            EntityKind::File => "file",
            EntityKind::Module => "module",
            EntityKind::Role => "role",
            EntityKind::Client => "client",
            EntityKind::Contact => "contact",
            EntityKind::Address => "address",
            EntityKind::Project => "project",
            EntityKind::Document => "document",
        }
    }

    /// Segmento da URL da coleção (ex: `/api/contact_types`).
    pub fn collection_path(self) -> &'static str {
        match self {
            EntityKind::Country => "countries",
            EntityKind::Language => "languages",
            EntityKind::Label => "labels",
            EntityKind::ContactType => "contact_types",
            EntityKind::ProjectType => "project_types",
            EntityKind::File => "files",
            EntityKind::Module => "modules",
            EntityKind::Role => "roles",
            EntityKind::Client => "clients",
            EntityKind::Contact => "contacts",
            EntityKind::Address => "addresses",
            EntityKind::Project => "projects",
            EntityKind::Document => "documents",
        }
    }

    /// Aceita o slug ("client"), o caminho da coleção ("clients") ou o nome
    /// curto do tipo ("Client").
    pub fn from_slug(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            kind.slug() == value
                || kind.collection_path() == value
                || kind.short_name() == value
        })
    }

    /// Último segmento do `object_class` (ex: "ContactType").
    pub fn short_name(self) -> &'static str {
        let class = self.object_class();
        class.rsplit("::").next().unwrap_or(class)
    }

    /// Nome completo do tipo Rust auditado (gravado em `History.objectClass`).
    pub fn object_class(self) -> &'static str {
        with_resource!(self, R => std::any::type_name::<R>())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Referência não tipada a uma entidade (tipo + id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn of<R: crate::graph::Resource>(id: EntityId<R>) -> Self {
        Self::new(R::KIND, id.get())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}
