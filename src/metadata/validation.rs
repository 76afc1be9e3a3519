// src/metadata/validation.rs

// =========================================================================
//  REGRAS DE VALIDAÇÃO POR ENTIDADE E CONTEXTO
// =========================================================================
//
// As regras rodam sobre o snapshot JSON da entidade já com o payload
// aplicado, e devolvem `validator::ValidationErrors` (o mesmo formato que o
// `#[derive(Validate)]` produz nos DTOs).

use std::borrow::Cow;

use serde_json::Value;
use validator::{ValidateEmail, ValidationError, ValidationErrors};

use crate::graph::{EntityGraph, EntityId, EntityKind, EntityRef};
use crate::models::Client;

pub const DEFAULT: &str = "Default";
pub const CLIENT_SIGNUP: &str = "client_signup_frontend";
pub const CLIENT_PUT: &str = "client_put_frontend";

#[derive(Debug, Clone, Copy)]
pub enum Check {
    NotBlank,
    NotNull,
    Email,
    MaxLength(usize),
    /// Valida em cascata as entidades referenciadas (contexto Default).
    Valid(EntityKind),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub field: &'static str,
    pub check: Check,
    pub contexts: &'static [&'static str],
}

const fn rule(field: &'static str, check: Check) -> Rule {
    Rule {
        field,
        check,
        contexts: &[DEFAULT],
    }
}

const fn rule_in(field: &'static str, check: Check, contexts: &'static [&'static str]) -> Rule {
    Rule { field, check, contexts }
}

const CLIENT_CONTEXTS: &[&str] = &[DEFAULT, CLIENT_SIGNUP, CLIENT_PUT];

const CLIENT: &[Rule] = &[
    rule_in("name", Check::NotBlank, CLIENT_CONTEXTS),
    rule_in("name", Check::MaxLength(255), CLIENT_CONTEXTS),
    rule_in("username", Check::NotBlank, CLIENT_CONTEXTS),
    rule_in("username", Check::Email, CLIENT_CONTEXTS),
    rule_in("username", Check::MaxLength(255), CLIENT_CONTEXTS),
    rule_in("plainPassword", Check::NotBlank, &[CLIENT_SIGNUP]),
    rule("addresses", Check::Valid(EntityKind::Address)),
    rule("contacts", Check::Valid(EntityKind::Contact)),
    rule("projects", Check::Valid(EntityKind::Project)),
];

const CONTACT: &[Rule] = &[
    rule("value", Check::NotBlank),
    rule("value", Check::MaxLength(255)),
    rule("contactType", Check::NotNull),
    rule("client", Check::NotBlank),
];

const ADDRESS: &[Rule] = &[
    rule("street", Check::NotBlank),
    rule("city", Check::NotBlank),
    rule("postalCode", Check::MaxLength(32)),
    rule("country", Check::NotNull),
    rule("client", Check::NotBlank),
];

const PROJECT: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("name", Check::MaxLength(255)),
];

const DOCUMENT: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("name", Check::MaxLength(255)),
];

const FILE: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("contentUrl", Check::NotBlank),
];

const MODULE: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("name", Check::MaxLength(255)),
    rule("roles", Check::Valid(EntityKind::Role)),
];

const LANGUAGE: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("code", Check::NotBlank),
    rule("code", Check::MaxLength(8)),
];

// Tabelas de referência: só o nome é obrigatório.
const NAMED: &[Rule] = &[
    rule("name", Check::NotBlank),
    rule("name", Check::MaxLength(255)),
];

pub fn rules(kind: EntityKind) -> &'static [Rule] {
    match kind {
        EntityKind::Client => CLIENT,
        EntityKind::Contact => CONTACT,
        EntityKind::Address => ADDRESS,
        EntityKind::Project => PROJECT,
        EntityKind::Document => DOCUMENT,
        EntityKind::File => FILE,
        EntityKind::Module => MODULE,
        EntityKind::Language => LANGUAGE,
        EntityKind::Role
        | EntityKind::Label
        | EntityKind::ContactType
        | EntityKind::ProjectType
        | EntityKind::Country => NAMED,
    }
}

/// Valida a entidade no contexto pedido. Entidade inexistente passa
/// (quem chama já tratou o 404).
pub fn validate(graph: &EntityGraph, entity: EntityRef, context: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    collect(graph, entity, context, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect(graph: &EntityGraph, entity: EntityRef, context: &str, errors: &mut ValidationErrors) {
    let Some(subject) = subject(graph, entity) else {
        return;
    };

    for rule in rules(entity.kind) {
        if !rule.contexts.contains(&context) {
            continue;
        }
        let value = subject.get(rule.field).unwrap_or(&Value::Null);

        match rule.check {
            Check::Valid(target) => {
                for child in related_ids(value) {
                    let mut nested = ValidationErrors::new();
                    collect(graph, EntityRef::new(target, child), DEFAULT, &mut nested);
                    for (field, message) in flatten(&nested) {
                        errors.add(rule.field, violation("invalid", format!("{}: {}", field, message)));
                    }
                }
            }
            check => {
                if let Some(error) = run(check, value) {
                    errors.add(rule.field, error);
                }
            }
        }
    }
}

// O snapshot não tem a senha em texto puro; o Client a acrescenta.
fn subject(graph: &EntityGraph, entity: EntityRef) -> Option<Value> {
    let mut value = graph.snapshot(entity)?;
    if entity.kind == EntityKind::Client {
        let plain = graph
            .get(EntityId::<Client>::new(entity.id))
            .and_then(Client::plain_password)
            .map(|plain| Value::String(plain.to_string()))
            .unwrap_or(Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("plainPassword".into(), plain);
        }
    }
    Some(value)
}

fn run(check: Check, value: &Value) -> Option<ValidationError> {
    match check {
        Check::NotBlank if is_blank(value) => Some(violation("not_blank", "This value should not be blank.")),
        Check::NotNull if value.is_null() => Some(violation("not_null", "This value should not be null.")),
        Check::Email => match value.as_str() {
            Some(email) if !email.is_empty() && !email.validate_email() => {
                Some(violation("email", "This value is not a valid email address."))
            }
            _ => None,
        },
        Check::MaxLength(limit) => match value.as_str() {
            Some(text) if text.chars().count() > limit => Some(violation(
                "max_length",
                format!(
                    "This value is too long. It should have {} characters or less.",
                    limit
                ),
            )),
            _ => None,
        },
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn related_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_i64).collect(),
        other => other.as_i64().into_iter().collect(),
    }
}

fn violation(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// (campo, mensagem) de cada violação, em ordem de campo.
pub fn flatten(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                (field.to_string(), message)
            })
        })
        .collect();
    out.sort();
    out
}
