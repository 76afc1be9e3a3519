// src/metadata/views.rs

// =========================================================================
//  VIEWS (grupos de serialização)
// =========================================================================
//
// Para cada campo: em quais grupos ele aparece. Leitura projeta o snapshot
// da entidade; escrita filtra o JSON de entrada. Um campo de relação embute
// o alvo quando o alvo tem campos próprios nos mesmos grupos; senão sai
// só o ID.

use serde_json::{Map, Value};

use crate::graph::{EntityGraph, EntityKind, EntityRef};

#[derive(Debug, Clone, Copy)]
pub struct FieldView {
    pub name: &'static str,
    pub groups: &'static [&'static str],
    pub relation: Option<EntityKind>,
}

const fn field(name: &'static str, groups: &'static [&'static str]) -> FieldView {
    FieldView {
        name,
        groups,
        relation: None,
    }
}

const fn relation(
    name: &'static str,
    target: EntityKind,
    groups: &'static [&'static str],
) -> FieldView {
    FieldView {
        name,
        groups,
        relation: Some(target),
    }
}

impl FieldView {
    fn in_any(&self, groups: &[&str]) -> bool {
        self.groups.iter().any(|group| groups.contains(group))
    }
}

/// Grupos ativos por operação.
#[derive(Debug, Clone, Copy)]
pub struct Contexts {
    pub item: &'static [&'static str],
    pub collection: &'static [&'static str],
    pub write: &'static [&'static str],
}

// Campos dos mixins, comuns a todas as entidades.
const MIXIN: [FieldView; 5] = [
    field("createdAt", &["read"]),
    field("updatedAt", &["read"]),
    field("createdBy", &["read"]),
    field("updatedBy", &["read"]),
    field("isActive", &["is_active_read", "is_active_write"]),
];

// Nesting máximo ao embutir relações (evita ciclos).
const MAX_DEPTH: usize = 2;

// --- Frontend do cliente ---
pub const CLIENT_GET_ITEM: &[&str] = &["client_get_item"];
pub const CLIENT_PUT_ITEM: &[&str] = &["client_put_item"];
pub const SIGNUP_COLLECTION: &[&str] = &["signup_collection"];

const CLIENT: &[FieldView] = &[
    field(
        "id",
        &[
            "client_read",
            "client_read_collection",
            "document_read",
            "project_read",
            "document_write",
            "project_write",
            "contact_read",
            "contact_write",
            "address_read",
            "address_write",
            "client_get_item",
        ],
    ),
    field(
        "name",
        &[
            "client_read",
            "client_read_collection",
            "client_write",
            "document_read",
            "project_read",
            "contact_read",
            "client_get_item",
            "client_put_item",
            "signup_collection",
            "address_read",
        ],
    ),
    relation("addresses", EntityKind::Address, &["client_read", "client_write"]),
    field("description", &["client_read", "client_read_collection", "client_write"]),
    relation(
        "labels",
        EntityKind::Label,
        &["client_read", "client_read_collection", "client_write"],
    ),
    relation(
        "contacts",
        EntityKind::Contact,
        &["client_read", "client_read_collection", "client_write"],
    ),
    relation(
        "projects",
        EntityKind::Project,
        &["document_read", "client_read", "client_write"],
    ),
    field(
        "username",
        &[
            "client_read",
            "client_write",
            "client_get_item",
            "client_put_item",
            "signup_collection",
        ],
    ),
    // Só escrita: nunca aparece numa leitura.
    field("plainPassword", &["client_write", "signup_collection"]),
];

const CONTACT: &[FieldView] = &[
    field("id", &["contact_read", "client_read", "client_read_collection", "client_write"]),
    field(
        "value",
        &["contact_read", "contact_write", "client_read", "client_read_collection", "client_write"],
    ),
    relation(
        "contactType",
        EntityKind::ContactType,
        &["contact_read", "contact_write", "client_read", "client_read_collection", "client_write"],
    ),
    relation("client", EntityKind::Client, &["contact_read", "contact_write"]),
];

const ADDRESS: &[FieldView] = &[
    field("id", &["address_read", "client_read", "client_write"]),
    field("street", &["address_read", "address_write", "client_read"]),
    field("city", &["address_read", "address_write", "client_read"]),
    field("postalCode", &["address_read", "address_write", "client_read"]),
    relation(
        "country",
        EntityKind::Country,
        &["address_read", "address_write", "client_read"],
    ),
    relation("client", EntityKind::Client, &["address_read", "address_write"]),
];

const PROJECT: &[FieldView] = &[
    field(
        "id",
        &["project_read", "client_read", "client_write", "document_read", "document_write"],
    ),
    field("name", &["project_read", "project_write", "client_read", "document_read"]),
    field("description", &["project_read", "project_write"]),
    relation("client", EntityKind::Client, &["project_read", "project_write"]),
    relation(
        "projectType",
        EntityKind::ProjectType,
        &["project_read", "project_write", "client_read"],
    ),
    relation("documents", EntityKind::Document, &["project_read", "project_write"]),
];

const DOCUMENT: &[FieldView] = &[
    field("id", &["document_read", "project_read"]),
    field("name", &["document_read", "document_write", "project_read"]),
    relation("client", EntityKind::Client, &["document_read", "document_write"]),
    relation("projects", EntityKind::Project, &["document_read", "document_write"]),
    relation(
        "files",
        EntityKind::File,
        &["document_read", "document_write", "project_read"],
    ),
];

const FILE: &[FieldView] = &[
    field("id", &["file_read", "document_read", "document_write", "project_read"]),
    field("name", &["file_read", "file_write", "document_read", "project_read"]),
    field("contentUrl", &["file_read", "file_write", "document_read", "project_read"]),
    field("mimeType", &["file_read", "file_write"]),
    field("size", &["file_read", "file_write"]),
];

const MODULE: &[FieldView] = &[
    field("id", &["module_read", "role_read"]),
    field("name", &["module_read", "module_write", "role_read"]),
    relation("roles", EntityKind::Role, &["module_read"]),
];

const ROLE: &[FieldView] = &[
    field("id", &["role_read", "module_read"]),
    field("name", &["role_read", "role_write", "module_read"]),
    relation("module", EntityKind::Module, &["role_read", "role_write"]),
];

const LABEL: &[FieldView] = &[
    field("id", &["label_read", "client_read", "client_read_collection", "client_write"]),
    field("name", &["label_read", "label_write", "client_read", "client_read_collection"]),
];

const CONTACT_TYPE: &[FieldView] = &[
    field(
        "id",
        &[
            "contact_type_read",
            "contact_read",
            "contact_write",
            "client_read",
            "client_read_collection",
            "client_write",
        ],
    ),
    field(
        "name",
        &[
            "contact_type_read",
            "contact_type_write",
            "contact_read",
            "client_read",
            "client_read_collection",
        ],
    ),
];

const PROJECT_TYPE: &[FieldView] = &[
    field(
        "id",
        &["project_type_read", "project_read", "project_write", "client_read", "client_write"],
    ),
    field(
        "name",
        &["project_type_read", "project_type_write", "project_read", "client_read"],
    ),
];

const LANGUAGE: &[FieldView] = &[
    field("id", &["language_read"]),
    field("name", &["language_read", "language_write"]),
    field("code", &["language_read", "language_write"]),
];

const COUNTRY: &[FieldView] = &[
    field("id", &["country_read", "address_read", "address_write", "client_read"]),
    field("name", &["country_read", "country_write", "address_read", "client_read"]),
];

pub fn fields(kind: EntityKind) -> &'static [FieldView] {
    match kind {
        EntityKind::Client => CLIENT,
        EntityKind::Contact => CONTACT,
        EntityKind::Address => ADDRESS,
        EntityKind::Project => PROJECT,
        EntityKind::Document => DOCUMENT,
        EntityKind::File => FILE,
        EntityKind::Module => MODULE,
        EntityKind::Role => ROLE,
        EntityKind::Label => LABEL,
        EntityKind::ContactType => CONTACT_TYPE,
        EntityKind::ProjectType => PROJECT_TYPE,
        EntityKind::Language => LANGUAGE,
        EntityKind::Country => COUNTRY,
    }
}

macro_rules! contexts {
    ($read:literal, $write:literal) => {
        Contexts {
            item: &[$read, "read", "is_active_read"],
            collection: &[$read, "read", "is_active_read"],
            write: &[$write, "is_active_write"],
        }
    };
}

pub fn contexts(kind: EntityKind) -> Contexts {
    match kind {
        EntityKind::Client => Contexts {
            item: &["client_read", "read", "is_active_read"],
            collection: &["client_read_collection", "read", "is_active_read"],
            write: &["client_write", "is_active_write"],
        },
        EntityKind::Contact => contexts!("contact_read", "contact_write"),
        EntityKind::Address => contexts!("address_read", "address_write"),
        EntityKind::Project => contexts!("project_read", "project_write"),
        EntityKind::Document => contexts!("document_read", "document_write"),
        EntityKind::File => contexts!("file_read", "file_write"),
        EntityKind::Module => contexts!("module_read", "module_write"),
        EntityKind::Role => contexts!("role_read", "role_write"),
        EntityKind::Label => contexts!("label_read", "label_write"),
        EntityKind::ContactType => contexts!("contact_type_read", "contact_type_write"),
        EntityKind::ProjectType => contexts!("project_type_read", "project_type_write"),
        EntityKind::Language => contexts!("language_read", "language_write"),
        EntityKind::Country => contexts!("country_read", "country_write"),
    }
}

// ---
// Leitura
// ---

/// Projeta a entidade nos grupos pedidos. `None` se ela não existe.
pub fn project(graph: &EntityGraph, entity: EntityRef, groups: &[&str]) -> Option<Value> {
    project_at(graph, entity, groups, 0)
}

fn project_at(graph: &EntityGraph, entity: EntityRef, groups: &[&str], depth: usize) -> Option<Value> {
    let snapshot = graph.snapshot(entity)?;

    // Carimbos só no nível de cima.
    let mixins: &[FieldView] = if depth == 0 { &MIXIN } else { &[] };

    let mut out = Map::new();
    for view in fields(entity.kind).iter().chain(mixins) {
        if !view.in_any(groups) {
            continue;
        }
        let Some(value) = snapshot.get(view.name) else {
            continue;
        };
        let value = match view.relation {
            Some(target) if depth < MAX_DEPTH && embeds(target, groups) => {
                embed(graph, target, value, groups, depth + 1)
            }
            _ => value.clone(),
        };
        out.insert(view.name.to_string(), value);
    }
    Some(Value::Object(out))
}

fn embeds(target: EntityKind, groups: &[&str]) -> bool {
    fields(target)
        .iter()
        .any(|view| view.name != "id" && view.in_any(groups))
}

fn embed(graph: &EntityGraph, target: EntityKind, value: &Value, groups: &[&str], depth: usize) -> Value {
    let nested = |id: &Value| {
        id.as_i64()
            .and_then(|id| project_at(graph, EntityRef::new(target, id), groups, depth))
    };
    match value {
        Value::Array(ids) => Value::Array(ids.iter().filter_map(nested).collect()),
        Value::Null => Value::Null,
        id => nested(id).unwrap_or(Value::Null),
    }
}

// ---
// Escrita
// ---

/// Mantém só as chaves graváveis nos grupos de escrita.
pub fn writable(kind: EntityKind, groups: &[&str], input: Value) -> Value {
    let Value::Object(map) = input else {
        return input;
    };
    let allowed = |key: &str| {
        fields(kind)
            .iter()
            .chain(MIXIN.iter())
            .any(|view| view.name == key && view.name != "id" && view.in_any(groups))
    };
    Value::Object(map.into_iter().filter(|(key, _)| allowed(key)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Contact, ContactType, Label};
    use serde_json::json;

    fn client_with_contact() -> (EntityGraph, EntityRef) {
        let mut graph = EntityGraph::new();
        let phone = graph.persist(ContactType::new("Telefone"));
        let label = graph.persist(Label::new("vip"));
        let client = graph.persist(Client::new("Ana", "ana@example.com"));
        let contact = graph.persist(Contact::new("+55 81 99999-0000", Some(phone)));
        graph.add_contact(client, contact).unwrap();
        graph.add_label(client, label).unwrap();
        (graph, EntityRef::of(client))
    }

    #[test]
    fn item_view_embeds_related_entities_and_hides_credentials() {
        let (graph, client) = client_with_contact();
        let view = project(&graph, client, contexts(EntityKind::Client).item).unwrap();

        assert_eq!(view["name"], "Ana");
        assert_eq!(view["username"], "ana@example.com");
        assert_eq!(view["labels"], json!([{"id": 1, "name": "vip"}]));
        assert_eq!(view["contacts"][0]["value"], "+55 81 99999-0000");
        assert_eq!(view["contacts"][0]["contactType"], json!({"id": 1, "name": "Telefone"}));
        assert_eq!(view["isActive"], true);
        assert!(view.get("createdAt").is_some());
        for hidden in ["password", "plainPassword", "token", "documents"] {
            assert!(view.get(hidden).is_none(), "{} vazou", hidden);
        }
    }

    #[test]
    fn collection_view_omits_username() {
        let (graph, client) = client_with_contact();
        let view = project(&graph, client, contexts(EntityKind::Client).collection).unwrap();
        assert!(view.get("username").is_none());
        assert_eq!(view["name"], "Ana");
    }

    #[test]
    fn relation_without_fields_in_group_renders_the_id() {
        let (graph, client) = client_with_contact();
        let contact = EntityRef::new(EntityKind::Contact, 1);
        let view = project(&graph, contact, contexts(EntityKind::Contact).item).unwrap();
        // Client tem `name` em contact_read, então é embutido.
        assert_eq!(view["client"]["name"], "Ana");
        assert_eq!(view["client"]["id"], client.id);

        let view = project(&graph, contact, &["contact_write"]).unwrap();
        assert_eq!(view["client"], json!(client.id));
    }

    #[test]
    fn writable_drops_read_only_and_unknown_keys() {
        let input = json!({
            "id": 99,
            "name": "Ana",
            "password": "hack",
            "token": "x",
            "plainPassword": "segredo",
            "isActive": false,
        });
        let filtered = writable(EntityKind::Client, contexts(EntityKind::Client).write, input);
        assert_eq!(
            filtered,
            json!({"name": "Ana", "plainPassword": "segredo", "isActive": false})
        );

        let signup = writable(
            EntityKind::Client,
            SIGNUP_COLLECTION,
            json!({"name": "Ana", "labels": [1], "isActive": false}),
        );
        assert_eq!(signup, json!({"name": "Ana"}));
    }
}
