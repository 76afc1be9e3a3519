// src/models/rbac.rs

use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    graph::{relation::BackRef, EntityGraph, EntityId, IdSet},
    models::{mixins::Stamps, Writable},
};

// Módulo do sistema (nome único) e os cargos que pertencem a ele.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub(crate) roles: IdSet<Role>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: IdSet::new(),
            stamps: Stamps::default(),
        }
    }

    pub fn roles(&self) -> &IdSet<Role> {
        &self.roles
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    pub(crate) module: Option<EntityId<Module>>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            stamps: Stamps::default(),
        }
    }

    pub fn module(&self) -> Option<EntityId<Module>> {
        self.module
    }
}

impl BackRef<Module> for Role {
    fn back_ref(&self) -> Option<EntityId<Module>> {
        self.module
    }

    fn set_back_ref(&mut self, parent: Option<EntityId<Module>>) {
        self.module = parent;
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInput {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl Writable for Module {
    type Input = ModuleInput;

    fn blank() -> Self {
        Module::new(String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: ModuleInput) -> Result<(), AppError> {
        graph.update(id, |module| {
            if let Some(name) = input.name {
                module.name = name;
            }
            if let Some(active) = input.is_active {
                module.stamps.is_active = active;
            }
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub module: Option<Option<EntityId<Module>>>,
    pub is_active: Option<bool>,
}

impl Writable for Role {
    type Input = RoleInput;

    fn blank() -> Self {
        Role::new(String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: RoleInput) -> Result<(), AppError> {
        graph.update(id, |role| {
            if let Some(name) = input.name {
                role.name = name;
            }
            if let Some(active) = input.is_active {
                role.stamps.is_active = active;
            }
        })?;
        if let Some(module) = input.module {
            graph.assign_role(id, module)?;
        }
        Ok(())
    }
}
