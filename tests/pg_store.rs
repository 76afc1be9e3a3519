// tests/pg_store.rs

// Roda contra um Postgres descartável:
//   TEST_DATABASE_URL=postgres://... cargo test --test pg_store -- --ignored
// As tabelas são esvaziadas no início.

use backoffice::db::{GraphStore, PgStore};
use backoffice::graph::EntityKind;
use backoffice::models::{AuditAction, Client, Module};
use backoffice::AppError;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Mutex;

// Os testes dividem o mesmo banco: um de cada vez.
static DATABASE: Mutex<()> = Mutex::new(());

async fn fresh_store() -> PgStore {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL deve ser definido");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    sqlx::query("TRUNCATE entities, histories RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();
    PgStore::new(pool)
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn flush_writes_rows_and_versioned_history_in_one_transaction() {
    let _guard = DATABASE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let store = fresh_store().await;

    // 1. criação
    let mut graph = store.begin(Some("admin".into())).await.unwrap();
    let ana = graph.persist(Client::new("Ana", "ana@example.com"));
    let crm = graph.persist(Module::new("CRM"));
    let report = store.flush(&mut graph).await.unwrap();
    assert_eq!(report.created, 2);
    assert!(report.histories.iter().all(|h| h.version() == 1));

    // 2. remoção antes da inserção: o nome único pode ser reaproveitado
    let mut graph = store.begin(Some("admin".into())).await.unwrap();
    graph.update(ana, |c| c.name = "Ana Maria".into()).unwrap();
    graph.delete(crm).unwrap();
    graph.persist(Module::new("CRM"));
    let report = store.flush(&mut graph).await.unwrap();
    assert_eq!((report.created, report.updated, report.removed), (1, 1, 1));

    let trail = store
        .histories_for(EntityKind::Client.object_class(), &ana.get().to_string())
        .await
        .unwrap();
    let versions: Vec<i32> = trail.iter().map(|h| h.version()).collect();
    assert_eq!(versions, vec![1, 2]);
    assert_eq!(trail[1].action(), AuditAction::Update);
    assert_eq!(trail[1].data(), Some(&json!({ "name": "Ana Maria" })));

    // 3. o grafo recarregado reflete o que foi gravado
    let graph = store.begin(None).await.unwrap();
    assert_eq!(graph.find(ana).unwrap().name, "Ana Maria");
    assert!(!graph.contains(crm));
    assert_eq!(graph.count::<Module>(), 1);
}

#[tokio::test]
#[ignore = "precisa de TEST_DATABASE_URL"]
async fn unique_violation_rolls_back_rows_and_history() {
    let _guard = DATABASE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let store = fresh_store().await;
    let mut graph = store.begin(None).await.unwrap();
    graph.persist(Client::new("Ana", "ana@example.com"));
    store.flush(&mut graph).await.unwrap();
    let before = store.histories().await.unwrap().len();

    let mut graph = store.begin(None).await.unwrap();
    graph.persist(Module::new("Financeiro"));
    graph.persist(Client::new("Outra Ana", "ana@example.com"));
    let err = store.flush(&mut graph).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::UniqueConstraintViolation { field: "username", .. }
    ));
    assert_eq!(store.histories().await.unwrap().len(), before);
    let graph = store.begin(None).await.unwrap();
    assert_eq!(graph.count::<Module>(), 0);
    assert_eq!(graph.count::<Client>(), 1);
}
