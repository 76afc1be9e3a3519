// src/graph/relation.rs

// =========================================================================
//  MOTOR DE CONSISTÊNCIA DE RELACIONAMENTOS
// =========================================================================
//
// Regras (valem para todo par pai/filho bidirecional):
// - adicionar um filho já presente é no-op;
// - ao adicionar, o filho passa a apontar para o pai (se ainda não apontava);
// - ao remover, a referência do filho só é limpa se ainda aponta para ESTE pai
//   (se já foi reatribuído a outro pai, não mexemos);
// - coleções nunca têm duplicatas.

use crate::graph::arena::IdSet;
use crate::graph::entity_graph::EntityGraph;
use crate::graph::id::EntityId;
use crate::graph::resource::Resource;
use crate::models::{Address, Client, Contact, Document, File, Label, Module, Project, Role};

/// Lado "filho" de uma relação um-para-muitos: guarda o ID do pai.
pub trait BackRef<P> {
    fn back_ref(&self) -> Option<EntityId<P>>;
    fn set_back_ref(&mut self, parent: Option<EntityId<P>>);
}

/// Quais lados mudaram em uma chamada de add/remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub parent: bool,
    pub child: bool,
}

impl Outcome {
    pub fn changed(self) -> bool {
        self.parent || self.child
    }
}

pub fn add_child<P, C: BackRef<P>>(
    members: &mut IdSet<C>,
    parent: EntityId<P>,
    child_id: EntityId<C>,
    child: &mut C,
) -> Outcome {
    if !members.insert(child_id) {
        return Outcome::default();
    }

    let reassign = child.back_ref() != Some(parent);
    if reassign {
        child.set_back_ref(Some(parent));
    }

    Outcome {
        parent: true,
        child: reassign,
    }
}

pub fn remove_child<P, C: BackRef<P>>(
    members: &mut IdSet<C>,
    parent: EntityId<P>,
    child_id: EntityId<C>,
    child: &mut C,
) -> Outcome {
    if !members.remove(child_id) {
        return Outcome::default();
    }

    // Referência obsoleta: o filho já pertence a outro pai.
    let clear = child.back_ref() == Some(parent);
    if clear {
        child.set_back_ref(None);
    }

    Outcome {
        parent: true,
        child: clear,
    }
}

/// Muitos-para-muitos com coleção dos dois lados: insere nos dois.
pub fn link<A, B>(
    owner_side: &mut IdSet<B>,
    owner: EntityId<A>,
    inverse_side: &mut IdSet<A>,
    inverse: EntityId<B>,
) -> Outcome {
    Outcome {
        parent: owner_side.insert(inverse),
        child: inverse_side.insert(owner),
    }
}

pub fn unlink<A, B>(
    owner_side: &mut IdSet<B>,
    owner: EntityId<A>,
    inverse_side: &mut IdSet<A>,
    inverse: EntityId<B>,
) -> Outcome {
    Outcome {
        parent: owner_side.remove(inverse),
        child: inverse_side.remove(owner),
    }
}

// ---
// Declaração das relações do modelo
// ---

/// Um-para-muitos com dono: coleção no pai, referência no filho.
pub trait OwnedRelation {
    type Parent: Resource;
    type Child: Resource + BackRef<Self::Parent>;

    /// Filho desligado do pai (e sem novo pai no flush) é apagado.
    const ORPHAN_REMOVAL: bool = false;

    fn members(parent: &Self::Parent) -> &IdSet<Self::Child>;
    fn members_mut(parent: &mut Self::Parent) -> &mut IdSet<Self::Child>;

    /// Empréstimos disjuntos da coleção do pai e do filho.
    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Self::Parent>,
        child: EntityId<Self::Child>,
    ) -> Option<(&mut IdSet<Self::Child>, &mut Self::Child)>;
}

/// Muitos-para-muitos com coleção nos dois lados (dono + inverso).
pub trait SharedRelation {
    type Owner: Resource;
    type Inverse: Resource;

    fn members(owner: &Self::Owner) -> &IdSet<Self::Inverse>;
    fn inverse_members(inverse: &Self::Inverse) -> &IdSet<Self::Owner>;

    fn split(
        graph: &mut EntityGraph,
        owner: EntityId<Self::Owner>,
        inverse: EntityId<Self::Inverse>,
    ) -> Option<(&mut IdSet<Self::Inverse>, &mut IdSet<Self::Owner>)>;
}

/// Muitos-para-muitos unidirecional: só o dono conhece a relação.
pub trait ReferenceSet {
    type Owner: Resource;
    type Target: Resource;

    fn members(owner: &Self::Owner) -> &IdSet<Self::Target>;
    fn members_mut(owner: &mut Self::Owner) -> &mut IdSet<Self::Target>;
}

pub struct ClientAddresses;

impl OwnedRelation for ClientAddresses {
    type Parent = Client;
    type Child = Address;

    fn members(parent: &Client) -> &IdSet<Address> {
        &parent.addresses
    }

    fn members_mut(parent: &mut Client) -> &mut IdSet<Address> {
        &mut parent.addresses
    }

    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Client>,
        child: EntityId<Address>,
    ) -> Option<(&mut IdSet<Address>, &mut Address)> {
        let parent = graph.clients.get_mut(parent)?;
        let child = graph.addresses.get_mut(child)?;
        Some((&mut parent.addresses, child))
    }
}

pub struct ClientContacts;

impl OwnedRelation for ClientContacts {
    type Parent = Client;
    type Child = Contact;

    fn members(parent: &Client) -> &IdSet<Contact> {
        &parent.contacts
    }

    fn members_mut(parent: &mut Client) -> &mut IdSet<Contact> {
        &mut parent.contacts
    }

    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Client>,
        child: EntityId<Contact>,
    ) -> Option<(&mut IdSet<Contact>, &mut Contact)> {
        let parent = graph.clients.get_mut(parent)?;
        let child = graph.contacts.get_mut(child)?;
        Some((&mut parent.contacts, child))
    }
}

pub struct ClientProjects;

impl OwnedRelation for ClientProjects {
    type Parent = Client;
    type Child = Project;

    const ORPHAN_REMOVAL: bool = true;

    fn members(parent: &Client) -> &IdSet<Project> {
        &parent.projects
    }

    fn members_mut(parent: &mut Client) -> &mut IdSet<Project> {
        &mut parent.projects
    }

    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Client>,
        child: EntityId<Project>,
    ) -> Option<(&mut IdSet<Project>, &mut Project)> {
        let parent = graph.clients.get_mut(parent)?;
        let child = graph.projects.get_mut(child)?;
        Some((&mut parent.projects, child))
    }
}

pub struct ClientDocuments;

impl OwnedRelation for ClientDocuments {
    type Parent = Client;
    type Child = Document;

    const ORPHAN_REMOVAL: bool = true;

    fn members(parent: &Client) -> &IdSet<Document> {
        &parent.documents
    }

    fn members_mut(parent: &mut Client) -> &mut IdSet<Document> {
        &mut parent.documents
    }

    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Client>,
        child: EntityId<Document>,
    ) -> Option<(&mut IdSet<Document>, &mut Document)> {
        let parent = graph.clients.get_mut(parent)?;
        let child = graph.documents.get_mut(child)?;
        Some((&mut parent.documents, child))
    }
}

pub struct ModuleRoles;

impl OwnedRelation for ModuleRoles {
    type Parent = Module;
    type Child = Role;

    fn members(parent: &Module) -> &IdSet<Role> {
        &parent.roles
    }

    fn members_mut(parent: &mut Module) -> &mut IdSet<Role> {
        &mut parent.roles
    }

    fn split(
        graph: &mut EntityGraph,
        parent: EntityId<Module>,
        child: EntityId<Role>,
    ) -> Option<(&mut IdSet<Role>, &mut Role)> {
        let parent = graph.modules.get_mut(parent)?;
        let child = graph.roles.get_mut(child)?;
        Some((&mut parent.roles, child))
    }
}

pub struct ProjectDocuments;

impl SharedRelation for ProjectDocuments {
    type Owner = Project;
    type Inverse = Document;

    fn members(owner: &Project) -> &IdSet<Document> {
        &owner.documents
    }

    fn inverse_members(inverse: &Document) -> &IdSet<Project> {
        &inverse.projects
    }

    fn split(
        graph: &mut EntityGraph,
        owner: EntityId<Project>,
        inverse: EntityId<Document>,
    ) -> Option<(&mut IdSet<Document>, &mut IdSet<Project>)> {
        let project = graph.projects.get_mut(owner)?;
        let document = graph.documents.get_mut(inverse)?;
        Some((&mut project.documents, &mut document.projects))
    }
}

pub struct ClientLabels;

impl ReferenceSet for ClientLabels {
    type Owner = Client;
    type Target = Label;

    fn members(owner: &Client) -> &IdSet<Label> {
        &owner.labels
    }

    fn members_mut(owner: &mut Client) -> &mut IdSet<Label> {
        &mut owner.labels
    }
}

pub struct DocumentFiles;

impl ReferenceSet for DocumentFiles {
    type Owner = Document;
    type Target = File;

    fn members(owner: &Document) -> &IdSet<File> {
        &owner.files
    }

    fn members_mut(owner: &mut Document) -> &mut IdSet<File> {
        &mut owner.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Child {
        parent: Option<EntityId<()>>,
    }

    impl BackRef<()> for Child {
        fn back_ref(&self) -> Option<EntityId<()>> {
            self.parent
        }

        fn set_back_ref(&mut self, parent: Option<EntityId<()>>) {
            self.parent = parent;
        }
    }

    #[test]
    fn add_is_idempotent_and_sets_the_owner() {
        let mut members = IdSet::new();
        let mut child = Child::default();
        let (parent, child_id) = (EntityId::new(1), EntityId::new(7));

        let first = add_child(&mut members, parent, child_id, &mut child);
        let second = add_child(&mut members, parent, child_id, &mut child);

        assert_eq!(first, Outcome { parent: true, child: true });
        assert!(!second.changed());
        assert_eq!(members.len(), 1);
        assert_eq!(child.parent, Some(parent));
    }

    #[test]
    fn remove_keeps_a_reference_that_was_reassigned() {
        let mut members = IdSet::new();
        let mut child = Child::default();
        let (first_parent, other_parent, child_id) =
            (EntityId::new(1), EntityId::new(2), EntityId::new(7));

        add_child(&mut members, first_parent, child_id, &mut child);
        child.set_back_ref(Some(other_parent));

        let outcome = remove_child(&mut members, first_parent, child_id, &mut child);
        assert_eq!(outcome, Outcome { parent: true, child: false });
        assert!(!members.contains(child_id));
        assert_eq!(child.parent, Some(other_parent));
    }

    #[test]
    fn removing_an_absent_child_is_a_no_op() {
        let mut members = IdSet::new();
        let mut child = Child {
            parent: Some(EntityId::new(1)),
        };
        let outcome = remove_child(&mut members, EntityId::new(1), EntityId::new(7), &mut child);
        assert!(!outcome.changed());
        assert_eq!(child.parent, Some(EntityId::new(1)));
    }

    #[test]
    fn link_and_unlink_touch_both_sides() {
        let mut left: IdSet<()> = IdSet::new();
        let mut right: IdSet<()> = IdSet::new();
        let (a, b) = (EntityId::new(1), EntityId::new(2));

        assert!(link(&mut left, a, &mut right, b).changed());
        assert!(!link(&mut left, a, &mut right, b).changed());
        assert!(left.contains(b) && right.contains(a));

        assert_eq!(unlink(&mut left, a, &mut right, b), Outcome { parent: true, child: true });
        assert!(left.is_empty() && right.is_empty());
    }
}
