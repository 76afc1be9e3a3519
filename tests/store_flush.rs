// tests/store_flush.rs

use std::sync::Arc;

use backoffice::db::{GraphStore, MemoryStore};
use backoffice::graph::EntityKind;
use backoffice::models::{Client, Module};
use backoffice::services::{AuthService, ClientService};
use backoffice::AppError;
use serde_json::json;

fn auth_service() -> AuthService {
    AuthService::new(
        "segredo-de-teste".to_string(),
        chrono::Duration::hours(1),
        chrono::Duration::minutes(60),
    )
}

#[tokio::test]
async fn duplicate_username_is_rejected_and_nothing_is_written() {
    let store = MemoryStore::new();
    let mut graph = store.begin(None).await.unwrap();
    graph.persist(Client::new("Ana", "ana@example.com"));
    store.flush(&mut graph).await.unwrap();
    let histories_before = store.histories().await.unwrap().len();

    let mut graph = store.begin(None).await.unwrap();
    graph.persist(Client::new("Outra Ana", "ana@example.com"));
    let err = store.flush(&mut graph).await.unwrap_err();

    match err {
        AppError::UniqueConstraintViolation { field, message } => {
            assert_eq!(field, "username");
            assert_eq!(message, "User already exists");
        }
        other => panic!("erro inesperado: {other:?}"),
    }
    let graph = store.begin(None).await.unwrap();
    assert_eq!(graph.count::<Client>(), 1);
    assert_eq!(store.histories().await.unwrap().len(), histories_before);
}

#[tokio::test]
async fn concurrent_units_of_work_race_on_unique_name() {
    let store = MemoryStore::new();
    let mut first = store.begin(None).await.unwrap();
    let mut second = store.begin(None).await.unwrap();
    first.persist(Module::new("Financeiro"));
    second.persist(Module::new("Financeiro"));

    store.flush(&mut first).await.unwrap();
    let err = store.flush(&mut second).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::UniqueConstraintViolation { field: "name", .. }
    ));
}

#[tokio::test]
async fn flush_report_counts_each_kind_of_change() {
    let store = MemoryStore::new();
    let mut graph = store.begin(None).await.unwrap();
    let ana = graph.persist(Client::new("Ana", "ana@example.com"));
    let bruno = graph.persist(Client::new("Bruno", "bruno@example.com"));
    store.flush(&mut graph).await.unwrap();

    let mut graph = store.begin(None).await.unwrap();
    graph.update(ana, |c| c.name = "Ana Maria".into()).unwrap();
    graph.delete(bruno).unwrap();
    graph.persist(Client::new("Carla", "carla@example.com"));
    let report = store.flush(&mut graph).await.unwrap();

    assert_eq!((report.created, report.updated, report.removed), (1, 1, 1));
    assert_eq!(report.histories.len(), 3);
}

#[tokio::test]
async fn signup_stores_only_the_bcrypt_hash() {
    let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
    let clients = ClientService::new(Arc::clone(&store), auth_service());

    let body = clients
        .signup(json!({
            "name": "Ana",
            "username": "ana@example.com",
            "plainPassword": "s3nha-forte"
        }))
        .await
        .unwrap();

    assert_eq!(body["username"], json!("ana@example.com"));
    assert!(body.get("plainPassword").is_none());
    assert!(body.get("password").is_none());

    let graph = store.begin(None).await.unwrap();
    let (_, client) = graph.iter::<Client>().next().unwrap();
    assert!(client.plain_password().is_none());
    assert!(bcrypt::verify("s3nha-forte", client.password()).unwrap());

    let histories = store.histories().await.unwrap();
    let created = histories
        .iter()
        .find(|h| h.object_class() == EntityKind::Client.object_class())
        .unwrap();
    let data = created.data().unwrap();
    assert!(data.get("password").is_none());
    assert!(data.get("plainPassword").is_none());
}

#[tokio::test]
async fn signup_without_password_fails_validation() {
    let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
    let clients = ClientService::new(Arc::clone(&store), auth_service());

    let err = clients
        .signup(json!({ "name": "Ana", "username": "ana@example.com" }))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    let graph = store.begin(None).await.unwrap();
    assert_eq!(graph.count::<Client>(), 0);
}

#[tokio::test]
async fn reset_token_can_be_used_only_once() {
    let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
    let clients = ClientService::new(Arc::clone(&store), auth_service());
    clients
        .signup(json!({
            "name": "Ana",
            "username": "ana@example.com",
            "plainPassword": "s3nha-forte"
        }))
        .await
        .unwrap();

    clients.remind_password("ana@example.com").await.unwrap();
    clients.remind_password("ninguem@example.com").await.unwrap();

    let graph = store.begin(None).await.unwrap();
    let (_, client) = graph.iter::<Client>().next().unwrap();
    let token = client.token().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let response = clients.login_by_token(&token).await.unwrap();
    let actor = auth_service().validate_token(&response.token).unwrap();
    assert_eq!(actor.username, "ana@example.com");
    assert!(actor.has_role("ROLE_CLIENT"));

    let again = clients.login_by_token(&token).await.unwrap_err();
    assert!(matches!(again, AppError::InvalidCredentials));
}
