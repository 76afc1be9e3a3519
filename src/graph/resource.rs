// src/graph/resource.rs

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::graph::arena::Arena;
use crate::graph::entity_graph::EntityGraph;
use crate::graph::id::EntityId;
use crate::graph::kind::EntityKind;
use crate::models::mixins::Stamps;
use crate::models::{
    Address, Client, Contact, ContactType, Country, Document, File, Label, Language, Module,
    Project, ProjectType, Role,
};

/// Entidade persistida pelo grafo.
///
/// Cada tipo sabe em qual arena do `EntityGraph` mora e expõe os carimbos
/// (`createdAt`, `updatedBy`...) para o helper compartilhado.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn arena(graph: &EntityGraph) -> &Arena<Self>;
    fn arena_mut(graph: &mut EntityGraph) -> &mut Arena<Self>;

    fn stamps(&self) -> &Stamps;
    fn stamps_mut(&mut self) -> &mut Stamps;

    /// Corpo persistido (sem o ID). É o que vai para a coluna `body`.
    fn body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Corpo + `id`: a forma usada pela auditoria e pelas views.
    fn snapshot(&self, id: EntityId<Self>) -> Value {
        let mut value = self.body();
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::from(id.get()));
        }
        value
    }
}

macro_rules! resource {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Resource for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn arena(graph: &EntityGraph) -> &Arena<Self> {
                &graph.$field
            }

            fn arena_mut(graph: &mut EntityGraph) -> &mut Arena<Self> {
                &mut graph.$field
            }

            fn stamps(&self) -> &Stamps {
                &self.stamps
            }

            fn stamps_mut(&mut self) -> &mut Stamps {
                &mut self.stamps
            }
        }
    };
}

resource!(Country, Country, countries);
resource!(Language, Language, languages);
resource!(Label, Label, labels);
resource!(ContactType, ContactType, contact_types);
resource!(ProjectType, ProjectType, project_types);
resource!(File, File, files);
resource!(Module, Module, modules);
resource!(Role, Role, roles);
resource!(Client, Client, clients);
resource!(Contact, Contact, contacts);
resource!(Address, Address, addresses);
resource!(Project, Project, projects);
resource!(Document, Document, documents);
