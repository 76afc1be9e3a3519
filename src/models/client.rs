// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    graph::{relation::BackRef, EntityGraph, EntityId, IdSet},
    models::{mixins::Stamps, ContactType, Country, Document, Label, Project, Writable},
};

// =========================================================================
//  CLIENTE (raiz do agregado)
// =========================================================================

/// As coleções (`addresses`, `contacts`, `projects`, `documents`, `labels`)
/// só mudam pelos mutadores do `EntityGraph`, que mantêm os dois lados da
/// relação consistentes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub name: String,
    pub username: String,
    pub description: Option<String>,

    #[serde(default)]
    pub(crate) addresses: IdSet<Address>,
    #[serde(default)]
    pub(crate) contacts: IdSet<Contact>,
    #[serde(default)]
    pub(crate) projects: IdSet<Project>,
    #[serde(default)]
    pub(crate) documents: IdSet<Document>,
    #[serde(default)]
    pub(crate) labels: IdSet<Label>,

    // Hash bcrypt (ou o placeholder aleatório gerado na construção).
    password: String,
    // Nunca persistida, nunca serializada.
    #[serde(skip)]
    plain_password: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_created_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Client {
    pub const ROLES: [&'static str; 1] = ["ROLE_CLIENT"];

    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            description: None,
            addresses: IdSet::new(),
            contacts: IdSet::new(),
            projects: IdSet::new(),
            documents: IdSet::new(),
            labels: IdSet::new(),
            password: placeholder_password(),
            plain_password: None,
            token: None,
            token_created_at: None,
            stamps: Stamps::default(),
        }
    }

    pub fn addresses(&self) -> &IdSet<Address> {
        &self.addresses
    }

    pub fn contacts(&self) -> &IdSet<Contact> {
        &self.contacts
    }

    pub fn projects(&self) -> &IdSet<Project> {
        &self.projects
    }

    pub fn documents(&self) -> &IdSet<Document> {
        &self.documents
    }

    pub fn labels(&self) -> &IdSet<Label> {
        &self.labels
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, hash: String) {
        self.password = hash;
    }

    pub fn plain_password(&self) -> Option<&str> {
        self.plain_password.as_deref()
    }

    pub fn set_plain_password(&mut self, plain: Option<String>) {
        self.plain_password = plain;
    }

    /// Descarta a senha em texto puro depois do hash.
    pub fn erase_credentials(&mut self) {
        self.plain_password = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn token_created_at(&self) -> Option<DateTime<Utc>> {
        self.token_created_at
    }

    pub fn set_token(&mut self, token: Option<String>, now: DateTime<Utc>) {
        self.token_created_at = token.as_ref().map(|_| now);
        self.token = token;
    }

    pub fn roles(&self) -> &'static [&'static str] {
        &Self::ROLES
    }
}

// 32 bytes aleatórios em hex: o cliente nunca fica com senha vazia.
fn placeholder_password() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

// =========================================================================
//  CONTATO E ENDEREÇO (pertencem a um cliente)
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub value: String,
    pub contact_type: Option<EntityId<ContactType>>,
    pub(crate) client: Option<EntityId<Client>>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Contact {
    pub fn new(value: impl Into<String>, contact_type: Option<EntityId<ContactType>>) -> Self {
        Self {
            value: value.into(),
            contact_type,
            client: None,
            stamps: Stamps::default(),
        }
    }

    pub fn client(&self) -> Option<EntityId<Client>> {
        self.client
    }
}

impl BackRef<Client> for Contact {
    fn back_ref(&self) -> Option<EntityId<Client>> {
        self.client
    }

    fn set_back_ref(&mut self, parent: Option<EntityId<Client>>) {
        self.client = parent;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: Option<EntityId<Country>>,
    pub(crate) client: Option<EntityId<Client>>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Address {
    pub fn new(street: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            postal_code: None,
            country: None,
            client: None,
            stamps: Stamps::default(),
        }
    }

    pub fn client(&self) -> Option<EntityId<Client>> {
        self.client
    }
}

impl BackRef<Client> for Address {
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
pub struct ClientInput {
    pub name: Option<String>,
    pub username: Option<String>,
    pub description: Option<String>,
    pub plain_password: Option<String>,
    pub addresses: Option<Vec<EntityId<Address>>>,
    pub contacts: Option<Vec<EntityId<Contact>>>,
    pub projects: Option<Vec<EntityId<Project>>>,
    pub labels: Option<Vec<EntityId<Label>>>,
    pub is_active: Option<bool>,
}

impl Writable for Client {
    type Input = ClientInput;

    fn blank() -> Self {
        Client::new(String::new(), String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: ClientInput) -> Result<(), AppError> {
        // 1. Campos simples
        graph.update(id, |client| {
            if let Some(name) = input.name {
                client.name = name;
            }
            if let Some(username) = input.username {
                client.username = username;
            }
            if input.description.is_some() {
                client.description = input.description;
            }
            if input.plain_password.is_some() {
                client.plain_password = input.plain_password;
            }
            if let Some(active) = input.is_active {
                client.stamps.is_active = active;
            }
        })?;

        // 2. Coleções (protocolo add/remove)
        if let Some(addresses) = input.addresses {
            graph.sync_addresses(id, &addresses)?;
        }
        if let Some(contacts) = input.contacts {
            graph.sync_contacts(id, &contacts)?;
        }
        if let Some(projects) = input.projects {
            graph.sync_projects(id, &projects)?;
        }
        if let Some(labels) = input.labels {
            graph.sync_labels(id, &labels)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub value: Option<String>,
    pub contact_type: Option<EntityId<ContactType>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub client: Option<Option<EntityId<Client>>>,
    pub is_active: Option<bool>,
}

impl Writable for Contact {
    type Input = ContactInput;

    fn blank() -> Self {
        Contact::new(String::new(), None)
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: ContactInput) -> Result<(), AppError> {
        if let Some(contact_type) = input.contact_type {
            graph.require_related(contact_type)?;
        }
        graph.update(id, |contact| {
            if let Some(value) = input.value {
                contact.value = value;
            }
            if input.contact_type.is_some() {
                contact.contact_type = input.contact_type;
            }
            if let Some(active) = input.is_active {
                contact.stamps.is_active = active;
            }
        })?;
        if let Some(client) = input.client {
            graph.assign_contact(id, client)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<EntityId<Country>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub client: Option<Option<EntityId<Client>>>,
    pub is_active: Option<bool>,
}

impl Writable for Address {
    type Input = AddressInput;

    fn blank() -> Self {
        Address::new(String::new(), String::new())
    }

    fn apply(graph: &mut EntityGraph, id: EntityId<Self>, input: AddressInput) -> Result<(), AppError> {
        if let Some(country) = input.country {
            graph.require_related(country)?;
        }
        graph.update(id, |address| {
            if let Some(street) = input.street {
                address.street = street;
            }
            if let Some(city) = input.city {
                address.city = city;
            }
            if input.postal_code.is_some() {
                address.postal_code = input.postal_code;
            }
            if input.country.is_some() {
                address.country = input.country;
            }
            if let Some(active) = input.is_active {
                address.stamps.is_active = active;
            }
        })?;
        if let Some(client) = input.client {
            graph.assign_address(id, client)?;
        }
        Ok(())
    }
}
