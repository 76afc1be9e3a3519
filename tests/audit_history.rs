// tests/audit_history.rs

use backoffice::db::{GraphStore, MemoryStore};
use backoffice::graph::{EntityId, EntityKind};
use backoffice::models::{AuditAction, Client, Label};
use serde_json::json;

#[tokio::test]
async fn versions_grow_across_flushes() {
    let store = MemoryStore::new();

    // 1. create
    let mut graph = store.begin(Some("admin".into())).await.unwrap();
    let label = graph.persist(Label::new("vip"));
    let report = store.flush(&mut graph).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.histories.len(), 1);
    let created = &report.histories[0];
    assert_eq!(created.action(), AuditAction::Create);
    assert_eq!(created.version(), 1);
    assert_eq!(created.username(), Some("admin"));
    assert_eq!(created.data().unwrap()["name"], json!("vip"));

    // 2. update: só o campo alterado
    let mut graph = store.begin(Some("admin".into())).await.unwrap();
    graph.update(label, |l| l.name = "ouro".into()).unwrap();
    let report = store.flush(&mut graph).await.unwrap();
    let updated = &report.histories[0];
    assert_eq!(updated.action(), AuditAction::Update);
    assert_eq!(updated.version(), 2);
    assert_eq!(updated.data(), Some(&json!({ "name": "ouro" })));

    // 3. remove
    let mut graph = store.begin(None).await.unwrap();
    graph.delete(label).unwrap();
    let report = store.flush(&mut graph).await.unwrap();
    let removed = &report.histories[0];
    assert_eq!(removed.action(), AuditAction::Remove);
    assert_eq!(removed.version(), 3);
    assert_eq!(removed.data(), None);
    assert_eq!(removed.username(), None);

    let object_id = label.get().to_string();
    let trail = store
        .histories_for(EntityKind::Label.object_class(), &object_id)
        .await
        .unwrap();
    let versions: Vec<i32> = trail.iter().map(|h| h.version()).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert!(trail.windows(2).all(|pair| pair[0].logged_at() <= pair[1].logged_at()));
}

#[tokio::test]
async fn update_that_changes_nothing_writes_no_record() {
    let store = MemoryStore::new();
    let mut graph = store.begin(None).await.unwrap();
    let label = graph.persist(Label::new("vip"));
    store.flush(&mut graph).await.unwrap();

    let mut graph = store.begin(None).await.unwrap();
    graph.update(label, |l| l.name = "vip".into()).unwrap();
    let report = store.flush(&mut graph).await.unwrap();

    assert_eq!(report.updated, 0);
    assert!(report.histories.is_empty());
    assert_eq!(store.histories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn credentials_never_reach_the_history() {
    let store = MemoryStore::new();
    let mut graph = store.begin(None).await.unwrap();
    let client = graph.persist(Client::new("Ana", "ana@example.com"));
    store.flush(&mut graph).await.unwrap();

    let mut graph = store.begin(None).await.unwrap();
    graph
        .update(client, |c| c.set_token(Some("abc".into()), chrono::Utc::now()))
        .unwrap();
    let report = store.flush(&mut graph).await.unwrap();

    for history in store.histories().await.unwrap() {
        let data = history.data().cloned().unwrap_or_default();
        assert!(data.get("password").is_none());
        assert!(data.get("token").is_none());
        assert!(data.get("tokenCreatedAt").is_none());
    }
    // A troca só de credenciais ainda gera um registro (vazio).
    assert_eq!(report.histories.len(), 1);
    assert_eq!(report.histories[0].data(), Some(&json!({})));
}

#[tokio::test]
async fn histories_can_be_found_by_id() {
    let store = MemoryStore::new();
    let mut graph = store.begin(None).await.unwrap();
    graph.persist(Label::new("a"));
    graph.persist(Label::new("b"));
    store.flush(&mut graph).await.unwrap();

    let all = store.histories().await.unwrap();
    assert_eq!(all.len(), 2);
    let second = store.find_history(all[1].id()).await.unwrap().unwrap();
    assert_eq!(second.object_id(), Some("2"));
    assert!(store.find_history(999).await.unwrap().is_none());

    // Cada objeto tem a própria sequência de versões.
    let first_label = EntityId::<Label>::new(1);
    let trail = store
        .histories_for(EntityKind::Label.object_class(), &first_label.to_string())
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].version(), 1);
}
