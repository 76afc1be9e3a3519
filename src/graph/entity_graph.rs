// src/graph/entity_graph.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::common::error::AppError;
use crate::graph::arena::Arena;
use crate::graph::id::{EntityId, Sequences};
use crate::graph::kind::{with_resource, EntityKind, EntityRef};
use crate::graph::relation::{
    self, BackRef, ClientAddresses, ClientContacts, ClientDocuments, ClientLabels, ClientProjects,
    DocumentFiles, ModuleRoles, Outcome, OwnedRelation, ProjectDocuments, ReferenceSet,
    SharedRelation,
};
use crate::graph::resource::Resource;
use crate::graph::tracker::{self, ChangeSet, ChangeTracker};
use crate::models::{
    Address, Client, Contact, ContactType, Country, Document, File, Label, Language, Module,
    Project, ProjectType, Role,
};

// =========================================================================
//  UNIDADE DE TRABALHO
// =========================================================================
//
// Um `EntityGraph` é o grafo de entidades carregado para UMA requisição.
// Todas as mutações são síncronas e passam por aqui; o `ChangeTracker`
// anota o que mudou para o flush (store + histórico).

#[derive(Debug, Clone)]
pub struct EntityGraph {
    pub(crate) countries: Arena<Country>,
    pub(crate) languages: Arena<Language>,
    pub(crate) labels: Arena<Label>,
    pub(crate) contact_types: Arena<ContactType>,
    pub(crate) project_types: Arena<ProjectType>,
    pub(crate) files: Arena<File>,
    pub(crate) modules: Arena<Module>,
    pub(crate) roles: Arena<Role>,
    pub(crate) clients: Arena<Client>,
    pub(crate) contacts: Arena<Contact>,
    pub(crate) addresses: Arena<Address>,
    pub(crate) projects: Arena<Project>,
    pub(crate) documents: Arena<Document>,

    sequences: Arc<Sequences>,
    actor: Option<String>,
    tracker: ChangeTracker,
}

/// Restrição de unicidade aplicada no flush (e espelhada em índice no Postgres).
#[derive(Debug, Clone, Copy)]
pub struct UniqueConstraint {
    pub kind: EntityKind,
    pub field: &'static str,
    pub index: &'static str,
    pub message: &'static str,
}

impl UniqueConstraint {
    pub fn violation(&self) -> AppError {
        AppError::UniqueConstraintViolation {
            field: self.field,
            message: self.message,
        }
    }

    pub fn by_index(index: &str) -> Option<&'static UniqueConstraint> {
        UNIQUE_CONSTRAINTS.iter().find(|constraint| constraint.index == index)
    }
}

pub const UNIQUE_CONSTRAINTS: [UniqueConstraint; 2] = [
    UniqueConstraint {
        kind: EntityKind::Client,
        field: "username",
        index: "entities_client_username_key",
        message: "User already exists",
    },
    UniqueConstraint {
        kind: EntityKind::Module,
        field: "name",
        index: "entities_module_name_key",
        message: "This value is already used.",
    },
];

fn not_found<R: Resource>(id: EntityId<R>) -> AppError {
    AppError::NotFound {
        resource: R::KIND.slug(),
        id: id.get(),
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::with_sequences(Arc::new(Sequences::default()))
    }

    pub fn with_sequences(sequences: Arc<Sequences>) -> Self {
        Self {
            countries: Arena::new(),
            languages: Arena::new(),
            labels: Arena::new(),
            contact_types: Arena::new(),
            project_types: Arena::new(),
            files: Arena::new(),
            modules: Arena::new(),
            roles: Arena::new(),
            clients: Arena::new(),
            contacts: Arena::new(),
            addresses: Arena::new(),
            projects: Arena::new(),
            documents: Arena::new(),
            sequences,
            actor: None,
            tracker: ChangeTracker::default(),
        }
    }

    /// Cópia independente do grafo para uma nova unidade de trabalho.
    /// As sequências de ID continuam compartilhadas.
    pub fn fork(&self, actor: Option<String>) -> Self {
        let mut graph = self.clone();
        graph.actor = actor;
        graph.tracker.clear();
        graph
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn sequences(&self) -> Arc<Sequences> {
        Arc::clone(&self.sequences)
    }

    // ---
    // Acesso genérico
    // ---

    /// Registra uma nova entidade e devolve a identidade gerada.
    pub fn persist<R: Resource>(&mut self, mut entity: R) -> EntityId<R> {
        let id = EntityId::new(self.sequences.next(R::KIND));
        entity
            .stamps_mut()
            .stamp_created(self.actor.as_deref(), Utc::now());
        R::arena_mut(self).insert(id, entity);
        self.tracker.record_created(EntityRef::of(id));
        id
    }

    pub fn get<R: Resource>(&self, id: EntityId<R>) -> Option<&R> {
        R::arena(self).get(id)
    }

    pub fn find<R: Resource>(&self, id: EntityId<R>) -> Result<&R, AppError> {
        self.get(id).ok_or_else(|| not_found(id))
    }

    pub fn contains<R: Resource>(&self, id: EntityId<R>) -> bool {
        R::arena(self).contains(id)
    }

    pub fn iter<R: Resource>(&self) -> impl Iterator<Item = (EntityId<R>, &R)> {
        R::arena(self).iter()
    }

    pub fn count<R: Resource>(&self) -> usize {
        R::arena(self).len()
    }

    /// Todas as referências de um tipo, em ordem de ID.
    pub fn refs(&self, kind: EntityKind) -> Vec<EntityRef> {
        with_resource!(kind, R => R::arena(self).ids().map(EntityRef::of::<R>).collect())
    }

    /// Aplica `change` na entidade, guardando antes a imagem "antes" dela.
    pub fn update<R: Resource, T>(
        &mut self,
        id: EntityId<R>,
        change: impl FnOnce(&mut R) -> T,
    ) -> Result<T, AppError> {
        self.touch(id)?;
        let entity = R::arena_mut(self)
            .get_mut(id)
            .ok_or_else(|| not_found(id))?;
        Ok(change(entity))
    }

    /// Um ID vindo do payload precisa existir (senão 400, não 404).
    pub fn require_related<R: Resource>(&self, id: EntityId<R>) -> Result<(), AppError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(AppError::RelatedNotFound {
                resource: R::KIND.slug(),
                id: id.get(),
            })
        }
    }

    fn touch<R: Resource>(&mut self, id: EntityId<R>) -> Result<(), AppError> {
        let entity_ref = EntityRef::of(id);
        let entity = self.find(id)?;
        if self.tracker.wants_before(&entity_ref) {
            let image = entity.body();
            self.tracker.record_before(entity_ref, image);
        }
        Ok(())
    }

    // ---
    // Protocolo genérico: um-para-muitos com dono
    // ---

    fn add_owned<Rel: OwnedRelation>(
        &mut self,
        parent: EntityId<Rel::Parent>,
        child: EntityId<Rel::Child>,
    ) -> Result<Outcome, AppError> {
        let present = Rel::members(self.find(parent)?).contains(child);
        self.find(child)?;
        if present {
            return Ok(Outcome::default());
        }

        self.touch(parent)?;
        self.touch(child)?;
        let (members, entity) = Rel::split(self, parent, child).ok_or_else(|| not_found(child))?;
        let outcome = relation::add_child(members, parent, child, entity);

        if Rel::ORPHAN_REMOVAL {
            self.tracker.unmark_orphan(&EntityRef::of(child));
        }
        Ok(outcome)
    }

    fn remove_owned<Rel: OwnedRelation>(
        &mut self,
        parent: EntityId<Rel::Parent>,
        child: EntityId<Rel::Child>,
    ) -> Result<Outcome, AppError> {
        self.detach_owned::<Rel>(parent, child, Rel::ORPHAN_REMOVAL)
    }

    fn detach_owned<Rel: OwnedRelation>(
        &mut self,
        parent: EntityId<Rel::Parent>,
        child: EntityId<Rel::Child>,
        mark_orphan: bool,
    ) -> Result<Outcome, AppError> {
        let present = Rel::members(self.find(parent)?).contains(child);
        self.find(child)?;
        if !present {
            return Ok(Outcome::default());
        }

        self.touch(parent)?;
        self.touch(child)?;
        let (members, entity) = Rel::split(self, parent, child).ok_or_else(|| not_found(child))?;
        let outcome = relation::remove_child(members, parent, child, entity);

        if mark_orphan {
            self.tracker.mark_orphan(EntityRef::of(child));
        }
        Ok(outcome)
    }

    /// Setter "cru" da referência do filho: não toca na coleção do pai.
    fn set_back_ref<Rel: OwnedRelation>(
        &mut self,
        child: EntityId<Rel::Child>,
        parent: Option<EntityId<Rel::Parent>>,
    ) -> Result<(), AppError> {
        if let Some(parent) = parent {
            self.find(parent)?;
        }
        self.update(child, |entity| entity.set_back_ref(parent))
    }

    /// Troca o pai de um filho pelos dois lados: sai da coleção do pai atual
    /// (sem virar órfão) e entra na do novo.
    fn move_child<Rel: OwnedRelation>(
        &mut self,
        child: EntityId<Rel::Child>,
        parent: Option<EntityId<Rel::Parent>>,
    ) -> Result<(), AppError> {
        if let Some(parent) = parent {
            self.require_related(parent)?;
        }
        let current = self.find(child)?.back_ref();

        if current != parent {
            if let Some(old) = current {
                if self.contains(old) {
                    self.detach_owned::<Rel>(old, child, false)?;
                }
            }
        }

        match parent {
            Some(parent) => self.add_owned::<Rel>(parent, child).map(|_| ()),
            None => self.set_back_ref::<Rel>(child, None),
        }
    }

    fn sync_owned<Rel: OwnedRelation>(
        &mut self,
        parent: EntityId<Rel::Parent>,
        wanted: &[EntityId<Rel::Child>],
    ) -> Result<(), AppError> {
        for id in wanted {
            self.require_related(*id)?;
        }
        let stale: Vec<_> = Rel::members(self.find(parent)?)
            .iter()
            .filter(|id| !wanted.contains(id))
            .collect();
        for id in stale {
            self.remove_owned::<Rel>(parent, id)?;
        }
        for id in wanted {
            self.add_owned::<Rel>(parent, *id)?;
        }
        Ok(())
    }

    // ---
    // Protocolo genérico: muitos-para-muitos
    // ---

    fn link_shared<Rel: SharedRelation>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        inverse: EntityId<Rel::Inverse>,
    ) -> Result<Outcome, AppError> {
        let owner_has = Rel::members(self.find(owner)?).contains(inverse);
        let inverse_has = Rel::inverse_members(self.find(inverse)?).contains(owner);
        if owner_has && inverse_has {
            return Ok(Outcome::default());
        }

        self.touch(owner)?;
        self.touch(inverse)?;
        let (owner_side, inverse_side) =
            Rel::split(self, owner, inverse).ok_or_else(|| not_found(inverse))?;
        Ok(relation::link(owner_side, owner, inverse_side, inverse))
    }

    fn unlink_shared<Rel: SharedRelation>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        inverse: EntityId<Rel::Inverse>,
    ) -> Result<Outcome, AppError> {
        let owner_has = Rel::members(self.find(owner)?).contains(inverse);
        let inverse_has = Rel::inverse_members(self.find(inverse)?).contains(owner);
        if !owner_has && !inverse_has {
            return Ok(Outcome::default());
        }

        self.touch(owner)?;
        self.touch(inverse)?;
        let (owner_side, inverse_side) =
            Rel::split(self, owner, inverse).ok_or_else(|| not_found(inverse))?;
        Ok(relation::unlink(owner_side, owner, inverse_side, inverse))
    }

    fn sync_shared_from_owner<Rel: SharedRelation>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        wanted: &[EntityId<Rel::Inverse>],
    ) -> Result<(), AppError> {
        for id in wanted {
            self.require_related(*id)?;
        }
        let stale: Vec<_> = Rel::members(self.find(owner)?)
            .iter()
            .filter(|id| !wanted.contains(id))
            .collect();
        for id in stale {
            self.unlink_shared::<Rel>(owner, id)?;
        }
        for id in wanted {
            self.link_shared::<Rel>(owner, *id)?;
        }
        Ok(())
    }

    fn sync_shared_from_inverse<Rel: SharedRelation>(
        &mut self,
        inverse: EntityId<Rel::Inverse>,
        wanted: &[EntityId<Rel::Owner>],
    ) -> Result<(), AppError> {
        for id in wanted {
            self.require_related(*id)?;
        }
        let stale: Vec<_> = Rel::inverse_members(self.find(inverse)?)
            .iter()
            .filter(|id| !wanted.contains(id))
            .collect();
        for id in stale {
            self.unlink_shared::<Rel>(id, inverse)?;
        }
        for id in wanted {
            self.link_shared::<Rel>(*id, inverse)?;
        }
        Ok(())
    }

    // ---
    // Protocolo genérico: conjunto de referências (unidirecional)
    // ---

    fn add_reference<Rel: ReferenceSet>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        target: EntityId<Rel::Target>,
    ) -> Result<Outcome, AppError> {
        self.find(target)?;
        if Rel::members(self.find(owner)?).contains(target) {
            return Ok(Outcome::default());
        }
        let inserted = self.update(owner, |entity| Rel::members_mut(entity).insert(target))?;
        Ok(Outcome {
            parent: inserted,
            child: false,
        })
    }

    fn remove_reference<Rel: ReferenceSet>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        target: EntityId<Rel::Target>,
    ) -> Result<Outcome, AppError> {
        self.find(target)?;
        if !Rel::members(self.find(owner)?).contains(target) {
            return Ok(Outcome::default());
        }
        let removed = self.update(owner, |entity| Rel::members_mut(entity).remove(target))?;
        Ok(Outcome {
            parent: removed,
            child: false,
        })
    }

    fn sync_references<Rel: ReferenceSet>(
        &mut self,
        owner: EntityId<Rel::Owner>,
        wanted: &[EntityId<Rel::Target>],
    ) -> Result<(), AppError> {
        for id in wanted {
            self.require_related(*id)?;
        }
        let stale: Vec<_> = Rel::members(self.find(owner)?)
            .iter()
            .filter(|id| !wanted.contains(id))
            .collect();
        for id in stale {
            // O alvo pode já ter sido apagado; basta tirar do conjunto.
            self.update(owner, |entity| Rel::members_mut(entity).remove(id))?;
        }
        for id in wanted {
            self.add_reference::<Rel>(owner, *id)?;
        }
        Ok(())
    }

    // =====================================================================
    //  MUTADORES NOMEADOS
    // =====================================================================

    pub fn add_address(&mut self, client: EntityId<Client>, address: EntityId<Address>) -> Result<Outcome, AppError> {
        self.add_owned::<ClientAddresses>(client, address)
    }

    pub fn remove_address(&mut self, client: EntityId<Client>, address: EntityId<Address>) -> Result<Outcome, AppError> {
        self.remove_owned::<ClientAddresses>(client, address)
    }

    pub fn add_contact(&mut self, client: EntityId<Client>, contact: EntityId<Contact>) -> Result<Outcome, AppError> {
        self.add_owned::<ClientContacts>(client, contact)
    }

    pub fn remove_contact(&mut self, client: EntityId<Client>, contact: EntityId<Contact>) -> Result<Outcome, AppError> {
        self.remove_owned::<ClientContacts>(client, contact)
    }

    pub fn add_project(&mut self, client: EntityId<Client>, project: EntityId<Project>) -> Result<Outcome, AppError> {
        self.add_owned::<ClientProjects>(client, project)
    }

    /// Se o projeto ainda estiver sem cliente no flush, ele é apagado.
    pub fn remove_project(&mut self, client: EntityId<Client>, project: EntityId<Project>) -> Result<Outcome, AppError> {
        self.remove_owned::<ClientProjects>(client, project)
    }

    pub fn add_document(&mut self, client: EntityId<Client>, document: EntityId<Document>) -> Result<Outcome, AppError> {
        self.add_owned::<ClientDocuments>(client, document)
    }

    pub fn remove_document(&mut self, client: EntityId<Client>, document: EntityId<Document>) -> Result<Outcome, AppError> {
        self.remove_owned::<ClientDocuments>(client, document)
    }

    pub fn add_label(&mut self, client: EntityId<Client>, label: EntityId<Label>) -> Result<Outcome, AppError> {
        self.add_reference::<ClientLabels>(client, label)
    }

    pub fn remove_label(&mut self, client: EntityId<Client>, label: EntityId<Label>) -> Result<Outcome, AppError> {
        self.remove_reference::<ClientLabels>(client, label)
    }

    pub fn project_add_document(&mut self, project: EntityId<Project>, document: EntityId<Document>) -> Result<Outcome, AppError> {
        self.link_shared::<ProjectDocuments>(project, document)
    }

    pub fn project_remove_document(&mut self, project: EntityId<Project>, document: EntityId<Document>) -> Result<Outcome, AppError> {
        self.unlink_shared::<ProjectDocuments>(project, document)
    }

    pub fn document_add_project(&mut self, document: EntityId<Document>, project: EntityId<Project>) -> Result<Outcome, AppError> {
        self.link_shared::<ProjectDocuments>(project, document)
    }

    pub fn document_remove_project(&mut self, document: EntityId<Document>, project: EntityId<Project>) -> Result<Outcome, AppError> {
        self.unlink_shared::<ProjectDocuments>(project, document)
    }

    pub fn document_add_file(&mut self, document: EntityId<Document>, file: EntityId<File>) -> Result<Outcome, AppError> {
        self.add_reference::<DocumentFiles>(document, file)
    }

    pub fn document_remove_file(&mut self, document: EntityId<Document>, file: EntityId<File>) -> Result<Outcome, AppError> {
        self.remove_reference::<DocumentFiles>(document, file)
    }

    pub fn module_add_role(&mut self, module: EntityId<Module>, role: EntityId<Role>) -> Result<Outcome, AppError> {
        self.add_owned::<ModuleRoles>(module, role)
    }

    pub fn module_remove_role(&mut self, module: EntityId<Module>, role: EntityId<Role>) -> Result<Outcome, AppError> {
        self.remove_owned::<ModuleRoles>(module, role)
    }

    // Setters crus (só o lado do filho).

    pub fn set_project_client(&mut self, project: EntityId<Project>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.set_back_ref::<ClientProjects>(project, client)
    }

    pub fn set_document_client(&mut self, document: EntityId<Document>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.set_back_ref::<ClientDocuments>(document, client)
    }

    pub fn set_address_client(&mut self, address: EntityId<Address>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.set_back_ref::<ClientAddresses>(address, client)
    }

    pub fn set_contact_client(&mut self, contact: EntityId<Contact>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.set_back_ref::<ClientContacts>(contact, client)
    }

    pub fn set_role_module(&mut self, role: EntityId<Role>, module: Option<EntityId<Module>>) -> Result<(), AppError> {
        self.set_back_ref::<ModuleRoles>(role, module)
    }

    // Troca de dono pelos dois lados (usado pelo lado de escrita da API).

    pub fn assign_address(&mut self, address: EntityId<Address>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.move_child::<ClientAddresses>(address, client)
    }

    pub fn assign_contact(&mut self, contact: EntityId<Contact>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.move_child::<ClientContacts>(contact, client)
    }

    pub fn assign_project(&mut self, project: EntityId<Project>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.move_child::<ClientProjects>(project, client)
    }

    pub fn assign_document(&mut self, document: EntityId<Document>, client: Option<EntityId<Client>>) -> Result<(), AppError> {
        self.move_child::<ClientDocuments>(document, client)
    }

    pub fn assign_role(&mut self, role: EntityId<Role>, module: Option<EntityId<Module>>) -> Result<(), AppError> {
        self.move_child::<ModuleRoles>(role, module)
    }

    // Substituição de coleção inteira (diff + add/remove).

    pub fn sync_addresses(&mut self, client: EntityId<Client>, wanted: &[EntityId<Address>]) -> Result<(), AppError> {
        self.sync_owned::<ClientAddresses>(client, wanted)
    }

    pub fn sync_contacts(&mut self, client: EntityId<Client>, wanted: &[EntityId<Contact>]) -> Result<(), AppError> {
        self.sync_owned::<ClientContacts>(client, wanted)
    }

    pub fn sync_projects(&mut self, client: EntityId<Client>, wanted: &[EntityId<Project>]) -> Result<(), AppError> {
        self.sync_owned::<ClientProjects>(client, wanted)
    }

    pub fn sync_documents(&mut self, client: EntityId<Client>, wanted: &[EntityId<Document>]) -> Result<(), AppError> {
        self.sync_owned::<ClientDocuments>(client, wanted)
    }

    pub fn sync_labels(&mut self, client: EntityId<Client>, wanted: &[EntityId<Label>]) -> Result<(), AppError> {
        self.sync_references::<ClientLabels>(client, wanted)
    }

    pub fn sync_project_documents(&mut self, project: EntityId<Project>, wanted: &[EntityId<Document>]) -> Result<(), AppError> {
        self.sync_shared_from_owner::<ProjectDocuments>(project, wanted)
    }

    pub fn sync_document_projects(&mut self, document: EntityId<Document>, wanted: &[EntityId<Project>]) -> Result<(), AppError> {
        self.sync_shared_from_inverse::<ProjectDocuments>(document, wanted)
    }

    pub fn sync_document_files(&mut self, document: EntityId<Document>, wanted: &[EntityId<File>]) -> Result<(), AppError> {
        self.sync_references::<DocumentFiles>(document, wanted)
    }

    pub fn sync_module_roles(&mut self, module: EntityId<Module>, wanted: &[EntityId<Role>]) -> Result<(), AppError> {
        self.sync_owned::<ModuleRoles>(module, wanted)
    }

    // =====================================================================
    //  EXCLUSÃO E CASCATAS
    // =====================================================================

    pub fn delete<R: Resource>(&mut self, id: EntityId<R>) -> Result<(), AppError> {
        self.delete_ref(EntityRef::of(id))
    }

    pub fn delete_ref(&mut self, target: EntityRef) -> Result<(), AppError> {
        let raw = target.id;
        match target.kind {
            EntityKind::Client => self.delete_client(EntityId::new(raw)),
            EntityKind::Project => self.delete_project(EntityId::new(raw)),
            EntityKind::Document => self.delete_document(EntityId::new(raw)),
            EntityKind::Address => self.delete_owned_child::<ClientAddresses>(EntityId::new(raw)),
            EntityKind::Contact => self.delete_owned_child::<ClientContacts>(EntityId::new(raw)),
            EntityKind::Role => self.delete_owned_child::<ModuleRoles>(EntityId::new(raw)),
            EntityKind::Module => self.delete_module(EntityId::new(raw)),
            EntityKind::Label => self.delete_referenced::<ClientLabels>(EntityId::new(raw)),
            EntityKind::File => self.delete_referenced::<DocumentFiles>(EntityId::new(raw)),
            EntityKind::Country => {
                let country = EntityId::<Country>::new(raw);
                let in_use = self.addresses.iter().any(|(_, a)| a.country == Some(country));
                self.delete_lookup(country, in_use.then_some("address"))
            }
            EntityKind::ContactType => {
                let contact_type = EntityId::<ContactType>::new(raw);
                let in_use = self
                    .contacts
                    .iter()
                    .any(|(_, c)| c.contact_type == Some(contact_type));
                self.delete_lookup(contact_type, in_use.then_some("contact"))
            }
            EntityKind::ProjectType => {
                let project_type = EntityId::<ProjectType>::new(raw);
                let in_use = self
                    .projects
                    .iter()
                    .any(|(_, p)| p.project_type == Some(project_type));
                self.delete_lookup(project_type, in_use.then_some("project"))
            }
            EntityKind::Language => self.delete_lookup(EntityId::<Language>::new(raw), None),
        }
    }

    // Cliente: leva junto endereços, contatos, projetos e documentos.
    // Quem conta é a referência do filho (lado canônico), não a coleção.
    fn delete_client(&mut self, id: EntityId<Client>) -> Result<(), AppError> {
        self.find(id)?;

        for address in self.addresses.ids_where(|a| a.client == Some(id)) {
            self.delete_owned_child::<ClientAddresses>(address)?;
        }
        for contact in self.contacts.ids_where(|c| c.client == Some(id)) {
            self.delete_owned_child::<ClientContacts>(contact)?;
        }
        for project in self.projects.ids_where(|p| p.client == Some(id)) {
            self.delete_project(project)?;
        }
        for document in self.documents.ids_where(|d| d.client == Some(id)) {
            self.delete_document(document)?;
        }

        self.remove_entity(id)
    }

    fn delete_project(&mut self, id: EntityId<Project>) -> Result<(), AppError> {
        let documents = self.find(id)?.documents.to_vec();
        for document in documents {
            if self.contains(document) {
                self.unlink_shared::<ProjectDocuments>(id, document)?;
            }
        }
        // Lado inverso desatualizado (ainda não reconstruído).
        for document in self.documents.ids_where(|d| d.projects.contains(id)) {
            self.update(document, |d| d.projects.remove(id))?;
        }

        self.detach_from_parents::<ClientProjects>(id)?;
        self.remove_entity(id)
    }

    fn delete_document(&mut self, id: EntityId<Document>) -> Result<(), AppError> {
        self.find(id)?;
        for project in self.projects.ids_where(|p| p.documents.contains(id)) {
            self.unlink_shared::<ProjectDocuments>(project, id)?;
        }

        self.detach_from_parents::<ClientDocuments>(id)?;
        self.remove_entity(id)
    }

    // Módulo: os cargos ficam, só perdem a referência (limpeza guardada).
    fn delete_module(&mut self, id: EntityId<Module>) -> Result<(), AppError> {
        self.find(id)?;
        for role in self.roles.ids_where(|r| r.module == Some(id)) {
            self.update(role, |r| {
                if r.module == Some(id) {
                    r.module = None;
                }
            })?;
        }
        self.remove_entity(id)
    }

    fn delete_owned_child<Rel: OwnedRelation>(&mut self, child: EntityId<Rel::Child>) -> Result<(), AppError> {
        self.find(child)?;
        self.detach_from_parents::<Rel>(child)?;
        self.remove_entity(child)
    }

    fn detach_from_parents<Rel: OwnedRelation>(&mut self, child: EntityId<Rel::Child>) -> Result<(), AppError> {
        let parents = <Rel::Parent as Resource>::arena(self).ids_where(|p| Rel::members(p).contains(child));
        for parent in parents {
            self.update(parent, |p| Rel::members_mut(p).remove(child))?;
        }
        Ok(())
    }

    fn delete_referenced<Rel: ReferenceSet>(&mut self, target: EntityId<Rel::Target>) -> Result<(), AppError> {
        self.find(target)?;
        let owners = <Rel::Owner as Resource>::arena(self).ids_where(|o| Rel::members(o).contains(target));
        for owner in owners {
            self.update(owner, |o| Rel::members_mut(o).remove(target))?;
        }
        self.remove_entity(target)
    }

    fn delete_lookup<R: Resource>(&mut self, id: EntityId<R>, referenced_by: Option<&'static str>) -> Result<(), AppError> {
        self.find(id)?;
        if let Some(referenced_by) = referenced_by {
            return Err(AppError::ReferenceInUse {
                resource: R::KIND.slug(),
                id: id.get(),
                referenced_by,
            });
        }
        self.remove_entity(id)
    }

    fn remove_entity<R: Resource>(&mut self, id: EntityId<R>) -> Result<(), AppError> {
        R::arena_mut(self).remove(id).ok_or_else(|| not_found(id))?;
        self.tracker.record_removed(EntityRef::of(id));
        Ok(())
    }

    // =====================================================================
    //  PREPARAÇÃO DO FLUSH
    // =====================================================================

    /// Apaga filhos desligados (projetos/documentos) que continuam sem
    /// cliente. Quem foi reatribuído antes do flush sobrevive.
    pub fn remove_orphans(&mut self) -> Result<usize, AppError> {
        let mut removed = 0;
        for orphan in self.tracker.take_orphans() {
            let abandoned = match orphan.kind {
                EntityKind::Project => self
                    .projects
                    .get(EntityId::new(orphan.id))
                    .is_some_and(|p| p.client.is_none()),
                EntityKind::Document => self
                    .documents
                    .get(EntityId::new(orphan.id))
                    .is_some_and(|d| d.client.is_none()),
                _ => false,
            };
            if abandoned {
                tracing::debug!("Removendo órfão {}", orphan);
                self.delete_ref(orphan)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Carimba `updatedAt/updatedBy` nas entidades que mudaram de verdade e
    /// esquece as que foram tocadas sem mudança.
    pub fn stamp_updates(&mut self) {
        let now = Utc::now();
        let touched: Vec<EntityRef> = self.tracker.touched().map(|(entity, _)| *entity).collect();

        for entity in touched {
            let changed = match (self.tracker.before_image(&entity), self.stored_value(entity)) {
                (Some(before), Some(after)) => !tracker::diff(before, &after).is_empty(),
                _ => false,
            };
            if !changed {
                self.tracker.forget_before(&entity);
                continue;
            }

            let actor = self.actor.clone();
            with_resource!(entity.kind, R => {
                if let Some(current) = R::arena_mut(self).get_mut(EntityId::new(entity.id)) {
                    current.stamps_mut().stamp_updated(actor.as_deref(), now);
                }
            });
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.tracker.is_empty()
    }

    pub fn change_set(&self) -> ChangeSet {
        self.tracker.change_set()
    }

    /// Chamado depois de um flush bem-sucedido.
    pub fn commit_changes(&mut self) {
        self.tracker.clear();
        self.rebuild_inverse_sides();
    }

    // ---
    // Serialização genérica (store, auditoria, views)
    // ---

    /// Corpo persistido (sem `id`).
    pub fn stored_value(&self, entity: EntityRef) -> Option<Value> {
        with_resource!(entity.kind, R => R::arena(self).get(EntityId::new(entity.id)).map(R::body))
    }

    /// Corpo + `id`.
    pub fn snapshot(&self, entity: EntityRef) -> Option<Value> {
        with_resource!(entity.kind, R => {
            let id = EntityId::<R>::new(entity.id);
            R::arena(self).get(id).map(|current| current.snapshot(id))
        })
    }

    /// Carrega uma linha vinda do store (sem rastrear como mudança).
    pub fn load_value(&mut self, kind: EntityKind, id: i64, body: Value) -> Result<(), AppError> {
        with_resource!(kind, R => {
            let entity: R = serde_json::from_value(body)
                .map_err(|e| anyhow::anyhow!("Corpo inválido para {}#{}: {}", kind, id, e))?;
            R::arena_mut(self).insert(EntityId::new(id), entity);
        });
        self.sequences.observe(kind, id);
        Ok(())
    }

    /// Aplica num grafo "canônico" as mudanças de outra unidade de trabalho.
    pub fn absorb(&mut self, from: &EntityGraph, changes: &ChangeSet) {
        for entity in changes.written() {
            with_resource!(entity.kind, R => {
                let id = EntityId::<R>::new(entity.id);
                if let Some(current) = R::arena(from).get(id) {
                    R::arena_mut(self).insert(id, current.clone());
                }
            });
        }
        for entity in &changes.removed {
            with_resource!(entity.kind, R => {
                R::arena_mut(self).remove(EntityId::<R>::new(entity.id));
            });
        }
        self.rebuild_inverse_sides();
    }

    pub fn check_unique_constraints(&self) -> Result<(), AppError> {
        for constraint in &UNIQUE_CONSTRAINTS {
            let bodies: Vec<Value> = with_resource!(constraint.kind, R => {
                R::arena(self).iter().map(|(_, current)| current.body()).collect()
            });

            let mut seen = HashSet::new();
            for body in &bodies {
                if let Some(value) = body.get(constraint.field).and_then(Value::as_str) {
                    if !seen.insert(value) {
                        return Err(constraint.violation());
                    }
                }
            }
        }
        Ok(())
    }

    /// Reconstrói as coleções inversas a partir dos lados canônicos.
    pub fn rebuild_inverse_sides(&mut self) {
        self.rebuild_owned::<ClientAddresses>();
        self.rebuild_owned::<ClientContacts>();
        self.rebuild_owned::<ClientProjects>();
        self.rebuild_owned::<ClientDocuments>();
        self.rebuild_owned::<ModuleRoles>();

        for (_, document) in self.documents.iter_mut() {
            document.projects.clear();
        }
        let links: Vec<(EntityId<Project>, EntityId<Document>)> = self
            .projects
            .iter()
            .flat_map(|(project, p)| p.documents.iter().map(move |document| (project, document)))
            .collect();
        for (project, document) in links {
            if let Some(document) = self.documents.get_mut(document) {
                document.projects.insert(project);
            }
        }
    }

    fn rebuild_owned<Rel: OwnedRelation>(&mut self) {
        for (_, parent) in <Rel::Parent as Resource>::arena_mut(self).iter_mut() {
            Rel::members_mut(parent).clear();
        }
        let links: Vec<_> = <Rel::Child as Resource>::arena(self)
            .iter()
            .filter_map(|(child, entity)| entity.back_ref().map(|parent| (parent, child)))
            .collect();
        for (parent, child) in links {
            if let Some(parent) = <Rel::Parent as Resource>::arena_mut(self).get_mut(parent) {
                Rel::members_mut(parent).insert(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_assigns_per_kind_ids_and_stamps() {
        let mut graph = EntityGraph::new().fork(Some("admin".into()));
        let client = graph.persist(Client::new("Ana", "ana@example.com"));
        let label = graph.persist(Label::new("vip"));

        assert_eq!(client.get(), 1);
        assert_eq!(label.get(), 1);
        let stamps = &graph.find(client).unwrap().stamps;
        assert_eq!(stamps.created_by.as_deref(), Some("admin"));
        assert!(stamps.created_at.is_some());
    }

    #[test]
    fn touching_without_changing_leaves_no_update() {
        let mut graph = EntityGraph::new();
        let label = graph.persist(Label::new("vip"));
        graph.commit_changes();

        graph.update(label, |l| l.name = "vip".into()).unwrap();
        graph.stamp_updates();
        assert!(graph.change_set().is_empty());

        graph.update(label, |l| l.name = "ouro".into()).unwrap();
        graph.stamp_updates();
        assert_eq!(graph.change_set().updated.len(), 1);
        assert!(graph.find(label).unwrap().stamps.updated_at.is_some());
    }

    #[test]
    fn rebuild_follows_the_child_references() {
        let mut graph = EntityGraph::new();
        let first = graph.persist(Client::new("Ana", "ana@example.com"));
        let second = graph.persist(Client::new("Bia", "bia@example.com"));
        let project = graph.persist(Project::new("Site"));

        graph.add_project(first, project).unwrap();
        graph.set_project_client(project, Some(second)).unwrap();
        graph.commit_changes();

        assert!(!graph.find(first).unwrap().projects().contains(project));
        assert!(graph.find(second).unwrap().projects().contains(project));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let mut graph = EntityGraph::new();
        graph.persist(Client::new("Ana", "ana@example.com"));
        graph.persist(Client::new("Outra Ana", "ana@example.com"));

        match graph.check_unique_constraints() {
            Err(AppError::UniqueConstraintViolation { field, message }) => {
                assert_eq!(field, "username");
                assert_eq!(message, "User already exists");
            }
            other => panic!("esperava conflito, veio {:?}", other),
        }
    }
}
