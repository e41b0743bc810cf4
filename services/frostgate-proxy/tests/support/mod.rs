//! Shared test fixtures: an in-process mock search engine plus a fully wired
//! proxy stack pointing at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use frostgate_core::{LifecycleConfig, ReloadMode};
use frostgate_proxy::proxy::Upstream;
use frostgate_proxy::{AppState, EngineClient, LifecycleManager, ProxySettings, SnapshotStore};
use frostgate_state::{MemoryStateStore, StateStore};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone)]
struct MockCollection {
    schema: Value,
    documents: Vec<String>,
}

/// Behavior knobs for the mock engine, set before spawning.
#[derive(Default)]
pub struct EngineBehavior {
    pub create_delay: Duration,
    pub import_delay: Duration,
}

struct EngineInner {
    collections: Mutex<HashMap<String, MockCollection>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    behavior: EngineBehavior,
}

/// A Typesense-shaped mock engine running on a local ephemeral port.
pub struct MockEngine {
    pub base_url: String,
    inner: Arc<EngineInner>,
}

impl MockEngine {
    pub async fn spawn(behavior: EngineBehavior) -> Self {
        let inner = Arc::new(EngineInner {
            collections: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            behavior,
        });

        let app = Router::new()
            .route("/collections", post(create_collection))
            .route(
                "/collections/:name",
                get(get_collection).delete(delete_collection),
            )
            .route("/collections/:name/documents/import", post(import_documents))
            .route("/collections/:name/documents/export", get(export_documents))
            .route("/collections/:name/documents/search", get(search_documents))
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            inner,
        }
    }

    pub async fn insert_collection(&self, name: &str, schema: Value, documents: Vec<&str>) {
        self.inner.collections.lock().await.insert(
            name.to_string(),
            MockCollection {
                schema,
                documents: documents.into_iter().map(str::to_string).collect(),
            },
        );
    }

    pub async fn has_collection(&self, name: &str) -> bool {
        self.inner.collections.lock().await.contains_key(name)
    }

    pub async fn documents(&self, name: &str) -> Vec<String> {
        self.inner
            .collections
            .lock()
            .await
            .get(name)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }
}

fn engine_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not Found" })),
    )
        .into_response()
}

async fn create_collection(State(inner): State<Arc<EngineInner>>, Json(schema): Json<Value>) -> Response {
    tokio::time::sleep(inner.behavior.create_delay).await;
    inner.create_calls.fetch_add(1, Ordering::SeqCst);
    let name = schema
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    inner.collections.lock().await.insert(
        name,
        MockCollection {
            schema: schema.clone(),
            documents: Vec::new(),
        },
    );
    (StatusCode::CREATED, Json(schema)).into_response()
}

async fn get_collection(
    State(inner): State<Arc<EngineInner>>,
    Path(name): Path<String>,
) -> Response {
    match inner.collections.lock().await.get(&name) {
        Some(collection) => Json(collection.schema.clone()).into_response(),
        None => engine_not_found(),
    }
}

async fn delete_collection(
    State(inner): State<Arc<EngineInner>>,
    Path(name): Path<String>,
) -> Response {
    inner.delete_calls.fetch_add(1, Ordering::SeqCst);
    match inner.collections.lock().await.remove(&name) {
        Some(collection) => Json(collection.schema).into_response(),
        None => engine_not_found(),
    }
}

async fn import_documents(
    State(inner): State<Arc<EngineInner>>,
    Path(name): Path<String>,
    body: String,
) -> Response {
    tokio::time::sleep(inner.behavior.import_delay).await;
    let mut collections = inner.collections.lock().await;
    match collections.get_mut(&name) {
        Some(collection) => {
            for line in body.lines().filter(|line| !line.is_empty()) {
                collection.documents.push(line.to_string());
            }
            Json(json!({ "success": true })).into_response()
        }
        None => engine_not_found(),
    }
}

async fn export_documents(
    State(inner): State<Arc<EngineInner>>,
    Path(name): Path<String>,
) -> Response {
    match inner.collections.lock().await.get(&name) {
        Some(collection) => {
            let mut body = collection.documents.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            body.into_response()
        }
        None => engine_not_found(),
    }
}

async fn search_documents(
    State(inner): State<Arc<EngineInner>>,
    Path(name): Path<String>,
) -> Response {
    match inner.collections.lock().await.get(&name) {
        Some(collection) => {
            Json(json!({ "found": collection.documents.len() })).into_response()
        }
        None => engine_not_found(),
    }
}

/// A fully wired proxy stack over a mock engine and in-memory state store.
pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStateStore>,
    pub manager: Arc<LifecycleManager>,
    pub snapshots: Arc<SnapshotStore>,
    pub engine: MockEngine,
    _snapshot_dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new(reload_mode: ReloadMode, behavior: EngineBehavior) -> Self {
        Self::with_blocking_wait(reload_mode, behavior, Duration::from_secs(3)).await
    }

    pub async fn with_blocking_wait(
        reload_mode: ReloadMode,
        behavior: EngineBehavior,
        blocking_wait: Duration,
    ) -> Self {
        let engine = MockEngine::spawn(behavior).await;
        let snapshot_dir = tempfile::tempdir().unwrap();

        let store = Arc::new(MemoryStateStore::new());
        let engine_client = Arc::new(
            EngineClient::new(&engine.base_url, "test-key", Duration::from_secs(10)).unwrap(),
        );
        let snapshots = Arc::new(SnapshotStore::new(snapshot_dir.path()));
        let manager = Arc::new(LifecycleManager::new(
            engine_client,
            Arc::clone(&snapshots),
            store.clone() as Arc<dyn StateStore>,
            LifecycleConfig::default().max_concurrent_reloads,
        ));

        let upstream = Arc::new(Upstream::new(&engine.base_url, Duration::from_secs(10)).unwrap());
        let state = AppState::new(
            store.clone() as Arc<dyn StateStore>,
            Arc::clone(&manager),
            upstream,
            ProxySettings {
                reload_mode,
                blocking_wait,
                retry_after_secs: 2,
            },
        );

        let app = frostgate_proxy::build_router(state.clone());

        Self {
            app,
            state,
            store,
            manager,
            snapshots,
            engine,
            _snapshot_dir: snapshot_dir,
        }
    }

    /// Seeds a collection that only exists as a snapshot on disk, recorded Cold.
    pub async fn seed_cold(&self, name: &str, documents: &[&str]) {
        use frostgate_core::CollectionState;
        use futures::StreamExt;

        let schema = json!({ "name": name, "fields": [{ "name": ".*", "type": "auto" }] });
        self.snapshots
            .save_schema(name, &serde_json::to_vec(&schema).unwrap())
            .await
            .unwrap();
        let mut jsonl = documents.join("\n");
        if !jsonl.is_empty() {
            jsonl.push('\n');
        }
        let chunk = bytes::Bytes::from(jsonl);
        let stream = futures::stream::iter(vec![Ok(chunk)]).boxed();
        self.snapshots.save_documents(name, stream).await.unwrap();

        self.store.force_set(name, CollectionState::Cold).await.unwrap();
    }

    /// Seeds a live collection in the engine, recorded Hot with a fresh access.
    pub async fn seed_hot(&self, name: &str, documents: Vec<&str>) {
        use frostgate_core::CollectionState;

        let schema = json!({ "name": name, "fields": [{ "name": ".*", "type": "auto" }] });
        self.engine.insert_collection(name, schema, documents).await;
        self.store.force_set(name, CollectionState::Hot).await.unwrap();
        self.store.touch(name).await.unwrap();
    }
}

pub fn get_request(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

pub fn post_request(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
