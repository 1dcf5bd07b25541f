//! Shared test helpers: an in-process stub of the API Explorer catalog service and a guard for
//! spawned child processes.

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::process::Child;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const PRODUCTS_PATH: &str = "/v5/products";
pub const APIS_PATH: &str = "/v3/apis";
pub const API_DETAIL_PATH: &str = "/v4/apis/detail";

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// Canned catalog content served by [`StubCatalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogFixture {
    groups: Vec<Value>,
    apis: HashMap<String, Vec<Value>>,
    details: HashMap<(String, String), Value>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    raw_bodies: HashMap<String, String>,
}

impl CatalogFixture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product group; each product is `(name, productshort)`.
    #[must_use]
    pub fn group(mut self, name: &str, products: &[(&str, &str)]) -> Self {
        let products: Vec<Value> = products
            .iter()
            .map(|(n, s)| json!({"name": n, "productshort": s, "description": format!("{n} ({s})")}))
            .collect();
        self.groups.push(json!({"name": name, "products": products}));
        self
    }

    /// Set the API listing of a product; each API is `(name, summary)`.
    #[must_use]
    pub fn apis(mut self, product_short: &str, apis: &[(&str, &str)]) -> Self {
        let rows = apis
            .iter()
            .enumerate()
            .map(|(i, (name, summary))| {
                json!({
                    "id": format!("{product_short}-{i}"),
                    "name": name,
                    "alias_name": name,
                    "method": "POST",
                    "summary": summary,
                    "tags": product_short,
                    "product_short": product_short,
                    "info_version": "v1"
                })
            })
            .collect();
        self.apis.insert(product_short.to_string(), rows);
        self
    }

    /// Set a product listing of `n` generated APIs named `Api0..Api{n-1}`.
    #[must_use]
    pub fn generated_apis(self, product_short: &str, n: usize) -> Self {
        let owned: Vec<(String, String)> = (0..n)
            .map(|i| (format!("Api{i}"), format!("Generated API {i}")))
            .collect();
        let borrowed: Vec<(&str, &str)> = owned
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        self.apis(product_short, &borrowed)
    }

    /// Set the detail document returned for `(product_short, name)`.
    #[must_use]
    pub fn detail(mut self, product_short: &str, name: &str, detail: Value) -> Self {
        self.details
            .insert((product_short.to_string(), name.to_string()), detail);
        self
    }

    /// Make every request to `path` (e.g. [`API_DETAIL_PATH`]) answer HTTP 500.
    #[must_use]
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Hold every response on `path` for `delay` before answering.
    #[must_use]
    pub fn delayed(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    /// Answer HTTP 200 with `body` verbatim on `path`, labelled as JSON whether or not it is.
    #[must_use]
    pub fn raw_body(mut self, path: &str, body: &str) -> Self {
        self.raw_bodies.insert(path.to_string(), body.to_string());
        self
    }
}

struct StubState {
    fixture: CatalogFixture,
    hits: Mutex<HashMap<String, usize>>,
}

/// Stub catalog service bound to an ephemeral localhost port. Shuts down on drop.
pub struct StubCatalog {
    base_url: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StubCatalog {
    /// Start serving `fixture`.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener fails.
    pub async fn start(fixture: CatalogFixture) -> anyhow::Result<Self> {
        let state = Arc::new(StubState {
            fixture,
            hits: Mutex::new(HashMap::new()),
        });

        let app = Router::new()
            .route(PRODUCTS_PATH, get(products))
            .route(APIS_PATH, get(api_page))
            .route(API_DETAIL_PATH, get(api_detail))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind stub catalog")?;
        let addr = listener.local_addr().context("stub catalog local_addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}/"),
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received on `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().get(path).copied().unwrap_or(0)
    }
}

impl Drop for StubCatalog {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Count the hit, apply any scripted delay, and return the scripted response, if any.
async fn record(state: &StubState, uri: &Uri) -> Option<Response> {
    let path = uri.path().to_string();
    *state.hits.lock().entry(path.clone()).or_insert(0) += 1;

    if let Some(delay) = state.fixture.delays.get(&path) {
        tokio::time::sleep(*delay).await;
    }
    if state.fixture.failing.contains(&path) {
        return Some((StatusCode::INTERNAL_SERVER_ERROR, "scripted failure").into_response());
    }
    state.fixture.raw_bodies.get(&path).map(|body| {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response()
    })
}

async fn products(State(state): State<Arc<StubState>>, uri: Uri) -> Response {
    if let Some(resp) = record(&state, &uri).await {
        return resp;
    }
    axum::Json(json!({"groups": state.fixture.groups})).into_response()
}

async fn api_page(
    State(state): State<Arc<StubState>>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    if let Some(resp) = record(&state, &uri).await {
        return resp;
    }
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
    let short = query.get("product_short").cloned().unwrap_or_default();

    let all = state.fixture.apis.get(&short).cloned().unwrap_or_default();
    let page: Vec<Value> = all.iter().skip(offset).take(limit).cloned().collect();
    axum::Json(json!({"count": all.len(), "api_basic_infos": page})).into_response()
}

async fn api_detail(
    State(state): State<Arc<StubState>>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    if let Some(resp) = record(&state, &uri).await {
        return resp;
    }
    let short = query.get("product_short").cloned().unwrap_or_default();
    let name = query.get("name").cloned().unwrap_or_default();
    match state.fixture.details.get(&(short, name)) {
        Some(detail) => axum::Json(detail.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such api").into_response(),
    }
}
