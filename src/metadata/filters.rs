// src/metadata/filters.rs

// =========================================================================
//  FILTROS, ORDENAÇÃO E PAGINAÇÃO DAS COLEÇÕES
// =========================================================================
//
// Query string aceita:
//   ?name=ana            busca (estratégia por campo, caminhos com ponto)
//   ?labels.id[]=1&labels.id[]=2   vários valores = OU
//   ?createdAt[after]=2024-01-01   datas: after, before, strictly_after, strictly_before
//   ?order[name]=asc     ordenação (padrão: id DESC)
//   ?page=2              30 itens por página

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::graph::{EntityGraph, EntityKind, EntityRef};
use crate::metadata::views;

pub const ITEMS_PER_PAGE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Exact,
    Partial,
    IPartial,
}

#[derive(Debug)]
pub struct FilterSpec {
    pub search: &'static [(&'static str, Strategy)],
    pub order: &'static [&'static str],
    pub dates: &'static [&'static str],
}

const STAMP_DATES: &[&str] = &["createdAt", "updatedAt"];

const NAMED: FilterSpec = FilterSpec {
    search: &[("id", Strategy::Exact), ("name", Strategy::IPartial)],
    order: &["id", "name", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const CLIENT: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::IPartial),
        ("labels.id", Strategy::Exact),
        ("contacts.value", Strategy::IPartial),
        ("description", Strategy::IPartial),
    ],
    order: &["id", "name", "description", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const CONTACT: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("value", Strategy::IPartial),
        ("contactType.name", Strategy::IPartial),
    ],
    order: &["id", "value", "contactType.name", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const ADDRESS: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("street", Strategy::IPartial),
        ("city", Strategy::IPartial),
        ("client", Strategy::Exact),
        ("country.name", Strategy::IPartial),
    ],
    order: &["id", "street", "city", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const PROJECT: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::IPartial),
        ("client", Strategy::Exact),
        ("projectType", Strategy::Exact),
    ],
    order: &["id", "name", "client", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const DOCUMENT: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::Partial),
        ("client", Strategy::Partial),
    ],
    order: &["id", "name", "client", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const FILE: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::IPartial),
        ("mimeType", Strategy::Exact),
    ],
    order: &["id", "name", "size", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const LANGUAGE: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::IPartial),
        ("code", Strategy::IPartial),
    ],
    order: &["id", "name", "code", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

const ROLE: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("name", Strategy::IPartial),
        ("module", Strategy::Exact),
    ],
    order: &["id", "name", "createdAt", "updatedAt"],
    dates: STAMP_DATES,
};

pub const HISTORY: FilterSpec = FilterSpec {
    search: &[
        ("id", Strategy::Exact),
        ("action", Strategy::IPartial),
        ("objectId", Strategy::IPartial),
        ("objectClass", Strategy::IPartial),
        ("username", Strategy::IPartial),
    ],
    order: &["id", "action", "objectId", "objectClass", "username", "loggedAt"],
    dates: &["loggedAt"],
};

pub fn spec(kind: EntityKind) -> &'static FilterSpec {
    match kind {
        EntityKind::Client => &CLIENT,
        EntityKind::Contact => &CONTACT,
        EntityKind::Address => &ADDRESS,
        EntityKind::Project => &PROJECT,
        EntityKind::Document => &DOCUMENT,
        EntityKind::File => &FILE,
        EntityKind::Language => &LANGUAGE,
        EntityKind::Role => &ROLE,
        EntityKind::Module
        | EntityKind::Label
        | EntityKind::ContactType
        | EntityKind::ProjectType
        | EntityKind::Country => &NAMED,
    }
}

// ---
// Query já interpretada
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateBound {
    After,
    Before,
    StrictlyAfter,
    StrictlyBefore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Search {
    path: String,
    strategy: Strategy,
    values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CollectionQuery {
    search: Vec<Search>,
    dates: Vec<(String, DateBound, DateTime<Utc>)>,
    order: Vec<(String, Direction)>,
    page: usize,
}

impl CollectionQuery {
    /// Parâmetros desconhecidos (ou fora da lista do recurso) são ignorados.
    pub fn parse(spec: &FilterSpec, pairs: &[(String, String)]) -> Self {
        let mut query = Self {
            search: Vec::new(),
            dates: Vec::new(),
            order: Vec::new(),
            page: 1,
        };

        for (key, value) in pairs {
            if key == "page" {
                query.page = value.parse::<usize>().unwrap_or(1).max(1);
                continue;
            }

            if let Some(field) = bracketed(key, "order") {
                if spec.order.contains(&field) {
                    let direction = if value.eq_ignore_ascii_case("desc") {
                        Direction::Desc
                    } else {
                        Direction::Asc
                    };
                    query.order.push((field.to_string(), direction));
                }
                continue;
            }

            if let Some((field, bound)) = date_param(key) {
                if spec.dates.contains(&field) {
                    if let Some(at) = parse_date(value) {
                        query.dates.push((field.to_string(), bound, at));
                    }
                }
                continue;
            }

            let path = key.strip_suffix("[]").unwrap_or(key);
            if let Some((field, strategy)) = spec.search.iter().find(|(field, _)| *field == path) {
                match query.search.iter_mut().find(|s| s.path == *field) {
                    Some(existing) => existing.values.push(value.clone()),
                    None => query.search.push(Search {
                        path: field.to_string(),
                        strategy: *strategy,
                        values: vec![value.clone()],
                    }),
                }
            }
        }

        if query.order.is_empty() {
            query.order.push(("id".to_string(), Direction::Desc));
        }
        query
    }

    /// Query de um recurso. Busca que termina numa relação (`client`,
    /// `projectType`...) compara o ID inteiro, seja qual for a estratégia
    /// declarada.
    pub fn for_kind(kind: EntityKind, pairs: &[(String, String)]) -> Self {
        let mut query = Self::parse(spec(kind), pairs);
        for search in &mut query.search {
            if ends_on_relation(kind, &search.path) {
                search.strategy = Strategy::Exact;
            }
        }
        query
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Filtra, ordena e recorta a página. `resolve(row, path)` devolve os
    /// valores do caminho (vários quando atravessa uma coleção).
    pub fn apply<T>(&self, rows: Vec<T>, resolve: impl Fn(&T, &str) -> Vec<Value>) -> Page<T> {
        let mut rows: Vec<T> = rows
            .into_iter()
            .filter(|row| self.matches(row, &resolve))
            .collect();

        rows.sort_by(|a, b| {
            for (path, direction) in &self.order {
                let left = resolve(a, path).into_iter().next().unwrap_or(Value::Null);
                let right = resolve(b, path).into_iter().next().unwrap_or(Value::Null);
                let ordering = compare(&left, &right);
                let ordering = match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let total_items = rows.len();
        let member = rows
            .into_iter()
            .skip(self.page.saturating_sub(1).saturating_mul(ITEMS_PER_PAGE))
            .take(ITEMS_PER_PAGE)
            .collect();
        Page { member, total_items }
    }

    fn matches<T>(&self, row: &T, resolve: &impl Fn(&T, &str) -> Vec<Value>) -> bool {
        let searches_ok = self.search.iter().all(|search| {
            let candidates: Vec<String> = resolve(row, &search.path).iter().filter_map(text).collect();
            search.values.iter().any(|wanted| {
                candidates
                    .iter()
                    .any(|candidate| strategy_matches(search.strategy, candidate, wanted))
            })
        });
        if !searches_ok {
            return false;
        }

        self.dates.iter().all(|(path, bound, limit)| {
            let Some(at) = resolve(row, path)
                .first()
                .and_then(Value::as_str)
                .and_then(parse_date)
            else {
                // Sem data: fica de fora.
                return false;
            };
            match bound {
                DateBound::After => at >= *limit,
                DateBound::Before => at <= *limit,
                DateBound::StrictlyAfter => at > *limit,
                DateBound::StrictlyBefore => at < *limit,
            }
        })
    }
}

/// Envelope de coleção: `{ "member": [...], "totalItems": N }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub member: Vec<T>,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            member: self.member.into_iter().map(f).collect(),
            total_items: self.total_items,
        }
    }
}

/// Resolve um caminho com pontos ("contacts.value") atravessando as
/// relações declaradas nas views.
pub fn resolve_in_graph(graph: &EntityGraph, entity: EntityRef, path: &str) -> Vec<Value> {
    let Some(snapshot) = graph.snapshot(entity) else {
        return Vec::new();
    };
    let segments: Vec<&str> = path.split('.').collect();
    let mut kind = entity.kind;
    let mut current = vec![snapshot];

    for (position, segment) in segments.iter().enumerate() {
        let mut values = Vec::new();
        for item in &current {
            match item.get(*segment) {
                Some(Value::Array(items)) => values.extend(items.iter().cloned()),
                Some(Value::Null) | None => {}
                Some(value) => values.push(value.clone()),
            }
        }

        if position + 1 == segments.len() {
            return values;
        }

        let Some(target) = views::fields(kind)
            .iter()
            .find(|view| view.name == *segment)
            .and_then(|view| view.relation)
        else {
            return Vec::new();
        };
        current = values
            .iter()
            .filter_map(Value::as_i64)
            .filter_map(|id| graph.snapshot(EntityRef::new(target, id)))
            .collect();
        kind = target;
    }
    Vec::new()
}

// ---
// Helpers
// ---

fn ends_on_relation(kind: EntityKind, path: &str) -> bool {
    let mut kind = kind;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(view) = views::fields(kind).iter().find(|view| view.name == segment) else {
            return false;
        };
        match (view.relation, segments.peek()) {
            (relation, None) => return relation.is_some(),
            (Some(target), Some(_)) => kind = target,
            (None, Some(_)) => return false,
        }
    }
    false
}

// "order[name]" -> Some("name") quando prefix == "order"
fn bracketed<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')
}

fn date_param(key: &str) -> Option<(&str, DateBound)> {
    let (field, rest) = key.split_once('[')?;
    let bound = match rest.strip_suffix(']')? {
        "after" => DateBound::After,
        "before" => DateBound::Before,
        "strictly_after" => DateBound::StrictlyAfter,
        "strictly_before" => DateBound::StrictlyBefore,
        _ => return None,
    };
    Some((field, bound))
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strategy_matches(strategy: Strategy, candidate: &str, wanted: &str) -> bool {
    match strategy {
        Strategy::Exact => candidate == wanted,
        Strategy::Partial => candidate.contains(wanted),
        Strategy::IPartial => candidate.to_lowercase().contains(&wanted.to_lowercase()),
    }
}

// null < bool < número < texto
fn compare(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Contact, Document, Label};
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn field(row: &Value, path: &str) -> Vec<Value> {
        row.get(path).cloned().into_iter().collect()
    }

    #[test]
    fn default_order_is_id_desc_and_pages_hold_thirty_items() {
        let rows: Vec<Value> = (1..=45).map(|id| json!({"id": id})).collect();
        let query = CollectionQuery::parse(&NAMED, &[]);
        let page = query.apply(rows.clone(), field);

        assert_eq!(page.total_items, 45);
        assert_eq!(page.member.len(), 30);
        assert_eq!(page.member[0]["id"], 45);

        let second = CollectionQuery::parse(&NAMED, &pairs(&[("page", "2")])).apply(rows, field);
        assert_eq!(second.member.len(), 15);
        assert_eq!(second.member[14]["id"], 1);
    }

    #[test]
    fn ipartial_ignores_case_and_unknown_keys_are_ignored() {
        let rows = vec![json!({"id": 1, "name": "Ana Souza"}), json!({"id": 2, "name": "Bia"})];
        let query = CollectionQuery::parse(&NAMED, &pairs(&[("name", "SOUZA"), ("password", "x")]));
        let page = query.apply(rows, field);
        assert_eq!(page.total_items, 1);
        assert_eq!(page.member[0]["id"], 1);
    }

    #[test]
    fn explicit_order_and_date_bounds() {
        let rows = vec![
            json!({"id": 1, "name": "b", "createdAt": "2024-01-10T00:00:00Z"}),
            json!({"id": 2, "name": "a", "createdAt": "2024-03-01T00:00:00Z"}),
            json!({"id": 3, "name": "c", "createdAt": null}),
        ];
        let query = CollectionQuery::parse(
            &NAMED,
            &pairs(&[("order[name]", "asc"), ("createdAt[after]", "2024-01-01")]),
        );
        let page = query.apply(rows, field);
        let ids: Vec<_> = page.member.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(1)]);
    }

    #[test]
    fn dotted_paths_cross_relations() {
        let mut graph = EntityGraph::new();
        let vip = graph.persist(Label::new("vip"));
        let ana = graph.persist(Client::new("Ana", "ana@example.com"));
        let bia = graph.persist(Client::new("Bia", "bia@example.com"));
        let contact = graph.persist(Contact::new("ana@empresa.com", None));
        graph.add_contact(ana, contact).unwrap();
        graph.add_label(bia, vip).unwrap();

        let rows = graph.refs(EntityKind::Client);
        let resolve = |row: &EntityRef, path: &str| resolve_in_graph(&graph, *row, path);

        let by_contact = CollectionQuery::parse(&CLIENT, &pairs(&[("contacts.value", "EMPRESA")]))
            .apply(rows.clone(), resolve);
        assert_eq!(by_contact.member, vec![EntityRef::of(ana)]);

        let by_label = CollectionQuery::parse(&CLIENT, &pairs(&[("labels.id[]", "1"), ("labels.id[]", "7")]))
            .apply(rows, resolve);
        assert_eq!(by_label.member, vec![EntityRef::of(bia)]);
    }

    #[test]
    fn page_beyond_the_end_is_empty_even_when_huge() {
        let rows: Vec<Value> = (1..=3).map(|id| json!({"id": id})).collect();
        let query = CollectionQuery::parse(&CLIENT, &pairs(&[("page", "1000000000000000000")]));
        let page = query.apply(rows.clone(), field);
        assert_eq!(page.total_items, 3);
        assert!(page.member.is_empty());

        let max = usize::MAX.to_string();
        let page = CollectionQuery::parse(&CLIENT, &pairs(&[("page", &max)])).apply(rows, field);
        assert!(page.member.is_empty());
    }

    #[test]
    fn relation_filters_compare_the_whole_id() {
        let mut graph = EntityGraph::new();
        let clients: Vec<_> = (1..=10)
            .map(|n| graph.persist(Client::new(format!("C{n}"), format!("c{n}@example.com"))))
            .collect();
        let first = graph.persist(Document::new("Contrato"));
        let tenth = graph.persist(Document::new("Proposta"));
        graph.add_document(clients[0], first).unwrap();
        graph.add_document(clients[9], tenth).unwrap();

        let rows = graph.refs(EntityKind::Document);
        let resolve = |row: &EntityRef, path: &str| resolve_in_graph(&graph, *row, path);

        let page = CollectionQuery::for_kind(EntityKind::Document, &pairs(&[("client", "1")])).apply(rows.clone(), resolve);
        assert_eq!(page.member, vec![EntityRef::of(first)]);

        // Campos de texto continuam parciais.
        let page = CollectionQuery::for_kind(EntityKind::Document, &pairs(&[("name", "Prop")])).apply(rows, resolve);
        assert_eq!(page.member, vec![EntityRef::of(tenth)]);
    }
}
