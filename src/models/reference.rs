// src/models/reference.rs

// Entidades de referência (tabelas de apoio): sem relações próprias.

use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    graph::{EntityGraph, EntityId},
    models::{mixins::Stamps, Writable},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub name: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Country {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stamps: Stamps::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub name: String,
    pub code: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Language {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            stamps: Stamps::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub name: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stamps: Stamps::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactType {
    pub name: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl ContactType {
    // IDs bem conhecidos (semeados pela migração).
    pub const PHONE: EntityId<ContactType> = EntityId::new(1);
    pub const EMAIL: EntityId<ContactType> = EntityId::new(2);
    pub const WWW: EntityId<ContactType> = EntityId::new(3);

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stamps: Stamps::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectType {
    pub name: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl ProjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stamps: Stamps::default(),
        }
    }
}

/// Anexo referenciado por documentos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub name: String,
    pub content_url: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl File {
    pub fn new(name: impl Into<String>, content_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_url: content_url.into(),
            mime_type: None,
            size: None,
            stamps: Stamps::default(),
        }
    }
}

// ---
// Payloads de escrita
// ---

/// Payload comum às tabelas de apoio que só têm `name`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedInput {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

macro_rules! named_writable {
    ($ty:ident) => {
        impl Writable for $ty {
            type Input = NamedInput;

            fn blank() -> Self {
                $ty::new(String::new())
            }

            fn apply(
                graph: &mut EntityGraph,
                id: EntityId<Self>,
                input: NamedInput,
            ) -> Result<(), AppError> {
                graph.update(id, |entity| {
                    if let Some(name) = input.name {
                        entity.name = name;
                    }
                    if let Some(active) = input.is_active {
                        entity.stamps.is_active = active;
                    }
                })
            }
        }
    };
}

named_writable!(Country);
named_writable!(Label);
named_writable!(ContactType);
named_writable!(ProjectType);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub is_active: Option<bool>,
}

impl Writable for Language {
    type Input = LanguageInput;

    fn blank() -> Self {
        Language::new(String::new(), String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: LanguageInput) -> Result<(), AppError> {
        graph.update(id, |language| {
            if let Some(name) = input.name {
                language.name = name;
            }
            if let Some(code) = input.code {
                language.code = code;
            }
            if let Some(active) = input.is_active {
                language.stamps.is_active = active;
            }
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub name: Option<String>,
    pub content_url: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub is_active: Option<bool>,
}

impl Writable for File {
    type Input = FileInput;

    fn blank() -> Self {
        File::new(String::new(), String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: FileInput) -> Result<(), AppError> {
        graph.update(id, |file| {
            if let Some(name) = input.name {
                file.name = name;
            }
            if let Some(url) = input.content_url {
                file.content_url = url;
            }
            if input.mime_type.is_some() {
                file.mime_type = input.mime_type;
            }
            if input.size.is_some() {
                file.size = input.size;
            }
            if let Some(active) = input.is_active {
                file.stamps.is_active = active;
            }
        })
    }
}
