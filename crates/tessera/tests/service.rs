//! End-to-end scenarios: handlers built by a `HandlerFactory`, served by a
//! `TransportHost`, backed by an in-memory document store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use tessera::prelude::*;
use tokio::sync::oneshot;

const ERR_MISSING: Code = Code::new("E1", "Entity missing");
const ERR_STORE: Code = Code::new("E2", "Store failed");
const ERR_RULE: Code = Code::new("E3", "Business rule violated");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Entity {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

struct Service {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    done: oneshot::Receiver<()>,
    store: InMemoryStore,
    repo: Arc<Repository>,
    calls: Arc<AtomicUsize>,
}

impl Service {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), self.done)
            .await
            .expect("host should finish draining")
            .expect("completion should be signalled");
    }
}

async fn find_entity(repo: Arc<Repository>, id: String, _: Headers) -> DomainResult<Entity> {
    repo.find_by_id("entities", id).await.map_err(|e| {
        let missing = e
            .cause_as::<StoreError>()
            .is_some_and(StoreError::is_not_found);
        e.coded(if missing { ERR_MISSING } else { ERR_STORE })
    })
}

async fn search(
    repo: Arc<Repository>,
    params: HashMap<String, String>,
    _: Headers,
) -> DomainResult<Vec<Entity>> {
    let filter = match params.get("name") {
        Some(name) => doc! { "name": name.as_str() },
        None => doc! {},
    };
    let sort = params.get("order").map_or("asc", String::as_str);
    repo.find("entities", filter, 10, 1, &["_id", sort])
        .await
        .map_err(|e| e.coded(ERR_STORE))
}

async fn count(repo: Arc<Repository>, _: Headers) -> DomainResult<u64> {
    repo.count("entities", doc! {}).await.map_err(|e| e.coded(ERR_STORE))
}

async fn start_service(store: InMemoryStore) -> Service {
    let repo = Arc::new(
        Repository::new(DEFAULT_TIMEOUT, Arc::new(store.clone()))
            .await
            .unwrap(),
    );
    let factory = HandlerFactory::new(
        Arc::clone(&repo),
        CodeStatusResponder::new()
            .map(ERR_MISSING, StatusCode::NOT_FOUND)
            .map(ERR_RULE, StatusCode::CONFLICT)
            .into_responder(),
        forward_headers(&[("x-trace-id", "traceId")]),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let create = factory.command(move |repo: Arc<Repository>, entity: Entity, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if entity.name.is_empty() {
                return Err(DomainError::from_code(ERR_RULE));
            }
            repo.create("entities", entity.id.clone(), &entity).await
        }
    });
    let rename = factory.command_with_response(
        |repo: Arc<Repository>, entity: Entity, headers: Headers| async move {
            repo.update("entities", entity.id.clone(), &entity).await?;
            Ok::<_, DomainError>(headers.get("traceId").map(ToString::to_string))
        },
    );

    let router = Router::new()
        .route("/x/y/z/{id}", factory.query_by_id(find_entity))
        .route("/x/y/search", factory.query_by_params(search))
        .route("/x/y/count", factory.query(count))
        .route_method(Method::POST, "/x/y/create", create)
        .route_method(Method::POST, "/x/y/rename", rename);

    let shutdown = ShutdownSignal::new();
    let (done_tx, done) = oneshot::channel();
    let addr = TransportHost::new(
        ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(Duration::from_secs(1))
            .build(),
        router,
    )
    .start_with_shutdown(shutdown.clone(), done_tx)
    .await
    .unwrap();

    Service {
        addr,
        shutdown,
        done,
        store,
        repo,
        calls,
    }
}

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new("test");
    store
        .insert_one("entities", doc! { "_id": "present", "name": "alpha" })
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_query_by_id_found_and_missing() {
    let service = start_service(seeded_store().await).await;

    let response = reqwest::get(service.url("/x/y/z/missing")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert!(response.bytes().await.unwrap().is_empty());

    let response = reqwest::get(service.url("/x/y/z/present")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let entity: Entity = response.json().await.unwrap();
    assert_eq!(
        entity,
        Entity {
            id: "present".to_string(),
            name: "alpha".to_string()
        }
    );

    service.stop().await;
}

#[tokio::test]
async fn test_non_canonical_path_is_not_routed() {
    let service = start_service(seeded_store().await).await;

    // Empty segments would shift the id position the handler reads from.
    for path in ["/x//y/z/present", "/x/y//z/present", "/x/y/z//present"] {
        let response = reqwest::get(service.url(path)).await.unwrap();
        assert_eq!(response.status().as_u16(), 404, "{path}");
        assert!(response.bytes().await.unwrap().is_empty());
    }

    let response = reqwest::get(service.url("/x/y/z/present/")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let entity: Entity = response.json().await.unwrap();
    assert_eq!(entity.id, "present");

    service.stop().await;
}

#[tokio::test]
async fn test_malformed_command_is_rejected_before_business_logic() {
    let service = start_service(InMemoryStore::new("test")).await;
    let client = reqwest::Client::new();

    let response = client
        .post(service.url("/x/y/create"))
        .header("content-type", "application/json")
        .body("{\"_id\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert!(response.bytes().await.unwrap().is_empty());
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    assert!(service.store.documents("entities").is_empty());

    service.stop().await;
}

#[tokio::test]
async fn test_command_success_and_business_rule_failure() {
    let service = start_service(InMemoryStore::new("test")).await;
    let client = HttpClient::new().unwrap();

    let created: Option<()> = client
        .post(
            &service.url("/x/y/create"),
            &Entity {
                id: "e1".to_string(),
                name: "first".to_string(),
            },
            &[],
        )
        .await
        .unwrap();
    assert!(created.is_none());
    assert_eq!(service.store.documents("entities").len(), 1);

    let err = client
        .post::<_, Option<()>>(
            &service.url("/x/y/create"),
            &Entity {
                id: "e2".to_string(),
                name: String::new(),
            },
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 409, ref body } if body.is_empty()));

    // Both requests reached the business function.
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);

    service.stop().await;
}

#[tokio::test]
async fn test_duplicate_create_is_unclassified_500() {
    let service = start_service(seeded_store().await).await;
    let client = HttpClient::new().unwrap();

    let err = client
        .post::<_, Option<()>>(
            &service.url("/x/y/create"),
            &Entity {
                id: "present".to_string(),
                name: "again".to_string(),
            },
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 500, .. }));

    service.stop().await;
}

#[tokio::test]
async fn test_command_with_response_sees_mapped_headers() {
    let service = start_service(seeded_store().await).await;
    let client = HttpClient::new().unwrap();
    let renamed = Entity {
        id: "present".to_string(),
        name: "beta".to_string(),
    };

    let trace: Option<String> = client
        .post(&service.url("/x/y/rename"), &renamed, &[("x-trace-id", "trace-7")])
        .await
        .unwrap();
    assert_eq!(trace.as_deref(), Some("trace-7"));

    let stored: Entity = client.get(&service.url("/x/y/z/present"), &[]).await.unwrap();
    assert_eq!(stored, renamed);

    // No trace header: the business function returns nothing, so no body.
    let trace: Option<String> = client
        .post(&service.url("/x/y/rename"), &renamed, &[])
        .await
        .unwrap();
    assert!(trace.is_none());

    service.stop().await;
}

#[tokio::test]
async fn test_query_by_params_first_value_wins() {
    let store = seeded_store().await;
    store
        .insert_one("entities", doc! { "_id": "other", "name": "gamma" })
        .await
        .unwrap();
    let service = start_service(store).await;
    let client = HttpClient::new().unwrap();

    let found: Vec<Entity> = client
        .get(&service.url("/x/y/search?name=gamma&name=alpha"), &[])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "other");

    let all: Vec<Entity> = client
        .get(&service.url("/x/y/search?order=desc"), &[])
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["present", "other"]);

    service.stop().await;
}

#[tokio::test]
async fn test_concurrent_counts_while_writing() {
    let service = start_service(InMemoryStore::new("test")).await;
    let client = HttpClient::new().unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let create_url = service.url("/x/y/create");
        let count_url = service.url("/x/y/count");
        tasks.push(tokio::spawn(async move {
            let entity = Entity {
                id: format!("e{i}"),
                name: format!("entity {i}"),
            };
            client
                .post::<_, Option<()>>(&create_url, &entity, &[])
                .await
                .unwrap();
            client.get::<u64>(&count_url, &[]).await.unwrap()
        }));
    }

    for task in tasks {
        let seen = task.await.unwrap();
        assert!((1..=10).contains(&seen));
    }

    let total: u64 = client.get(&service.url("/x/y/count"), &[]).await.unwrap();
    assert_eq!(total, 10);

    service.stop().await;
}

#[tokio::test]
async fn test_disconnected_repository_surfaces_as_500() {
    let service = start_service(seeded_store().await).await;
    let client = HttpClient::new().unwrap();

    let found: Entity = client.get(&service.url("/x/y/z/present"), &[]).await.unwrap();
    assert_eq!(found.name, "alpha");

    service.repo.disconnect().await;

    // Store failures are coded, but the code has no status mapping.
    let err = client
        .get::<Entity>(&service.url("/x/y/z/present"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 500, .. }));

    let err = client
        .get::<u64>(&service.url("/x/y/count"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 500, .. }));

    service.stop().await;
}
