// src/models/project.rs

use serde::{Deserialize, Serialize};

use crate::{
    common::error::AppError,
    graph::{relation::BackRef, EntityGraph, EntityId, IdSet},
    models::{mixins::Stamps, Client, File, ProjectType, Writable},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
    pub(crate) client: Option<EntityId<Client>>,
    pub project_type: Option<EntityId<ProjectType>>,
    // Lado dono do muitos-para-muitos com Document.
    #[serde(default)]
    pub(crate) documents: IdSet<Document>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            client: None,
            project_type: None,
            documents: IdSet::new(),
            stamps: Stamps::default(),
        }
    }

    pub fn client(&self) -> Option<EntityId<Client>> {
        self.client
    }

    pub fn documents(&self) -> &IdSet<Document> {
        &self.documents
    }
}

impl BackRef<Client> for Project {
    fn back_ref(&self) -> Option<EntityId<Client>> {
        self.client
    }

    fn set_back_ref(&mut self, parent: Option<EntityId<Client>>) {
        self.client = parent;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    pub(crate) client: Option<EntityId<Client>>,
    // Lado inverso: reconstruído a partir de `Project.documents`.
    #[serde(default)]
    pub(crate) projects: IdSet<Project>,
    #[serde(default)]
    pub(crate) files: IdSet<File>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: None,
            projects: IdSet::new(),
            files: IdSet::new(),
            stamps: Stamps::default(),
        }
    }

    pub fn client(&self) -> Option<EntityId<Client>> {
        self.client
    }

    pub fn projects(&self) -> &IdSet<Project> {
        &self.projects
    }

    pub fn files(&self) -> &IdSet<File> {
        &self.files
    }
}

impl BackRef<Client> for Document {
    fn back_ref(&self) -> Option<EntityId<Client>> {
        self.client
    }

    fn set_back_ref(&mut self, parent: Option<EntityId<Client>>) {
        self.client = parent;
    }
}

// ---
// Payloads de escrita
// ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub client: Option<Option<EntityId<Client>>>,
    pub project_type: Option<EntityId<ProjectType>>,
    pub documents: Option<Vec<EntityId<Document>>>,
    pub is_active: Option<bool>,
}

impl Writable for Project {
    type Input = ProjectInput;

    fn blank() -> Self {
        Project::new(String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: ProjectInput) -> Result<(), AppError> {
        if let Some(project_type) = input.project_type {
            graph.require_related(project_type)?;
        }
        graph.update(id, |project| {
            if let Some(name) = input.name {
                project.name = name;
            }
            if input.description.is_some() {
                project.description = input.description;
            }
            if input.project_type.is_some() {
                project.project_type = input.project_type;
            }
            if let Some(active) = input.is_active {
                project.stamps.is_active = active;
            }
        })?;
        if let Some(client) = input.client {
            graph.assign_project(id, client)?;
        }
        if let Some(documents) = input.documents {
            graph.sync_project_documents(id, &documents)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub client: Option<Option<EntityId<Client>>>,
    pub projects: Option<Vec<EntityId<Project>>>,
    pub files: Option<Vec<EntityId<File>>>,
    pub is_active: Option<bool>,
}

impl Writable for Document {
    type Input = DocumentInput;

    fn blank() -> Self {
        Document::new(String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: DocumentInput) -> Result<(), AppError> {
        graph.update(id, |document| {
            if let Some(name) = input.name {
                document.name = name;
            }
            if let Some(active) = input.is_active {
                document.stamps.is_active = active;
            }
        })?;
        if let Some(client) = input.client {
            graph.assign_document(id, client)?;
        }
        if let Some(projects) = input.projects {
            graph.sync_document_projects(id, &projects)?;
        }
        if let Some(files) = input.files {
            graph.sync_document_files(id, &files)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn explicit_null_client_detaches_but_absent_key_keeps_it() {
        let mut graph = EntityGraph::new();
        let ana = graph.persist(Client::new("Ana", "ana@example.com"));
        let project = Project::create(&mut graph, input(json!({"name": "Site", "client": ana.get()}))).unwrap();
        let document = Document::create(&mut graph, input(json!({"name": "Contrato", "client": ana.get()}))).unwrap();

        // Sem a chave: o dono fica
        Project::apply(&mut graph, project, input(json!({"name": "Site novo"}))).unwrap();
        assert_eq!(graph.find(project).unwrap().client(), Some(ana));

        Project::apply(&mut graph, project, input(json!({"client": null}))).unwrap();
        Document::apply(&mut graph, document, input(json!({"client": null}))).unwrap();

        assert_eq!(graph.find(project).unwrap().client(), None);
        assert_eq!(graph.find(document).unwrap().client(), None);
        let client = graph.find(ana).unwrap();
        assert!(!client.projects().contains(project));
        assert!(!client.documents().contains(document));
    }
}
