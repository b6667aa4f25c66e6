//! Mock hosted row store for testing
//!
//! Simulates the REST table dialect at /rest/v1/{table}: eq filters, order
//! clauses (ignored - ordering is the server's concern), representation
//! returns on insert/update.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Mock store state
struct MockStoreState {
    /// Rows per table
    tables: HashMap<String, Vec<Value>>,
    /// Every insert body received, per table
    inserts: HashMap<String, Vec<Value>>,
    /// Monotonic id source for representation returns
    next_id: u64,
    /// When set, every request gets this status code back
    fail_with: Option<u16>,
}

/// Mock hosted store server
pub struct MockStoreServer {
    addr: SocketAddr,
    state: Arc<RwLock<MockStoreState>>,
    handle: JoinHandle<()>,
}

impl MockStoreServer {
    /// Start a mock store on a random port
    pub async fn start() -> Self {
        let state = Arc::new(RwLock::new(MockStoreState {
            tables: HashMap::new(),
            inserts: HashMap::new(),
            next_id: 1,
            fail_with: None,
        }));

        let app = Router::new()
            .route(
                "/rest/v1/{table}",
                get(handle_select).post(handle_insert).patch(handle_update),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL for a StoreConfig
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Preload rows into a table
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        self.state
            .write()
            .await
            .tables
            .insert(table.to_string(), rows);
    }

    /// All insert bodies received for a table
    pub async fn inserts(&self, table: &str) -> Vec<Value> {
        self.state
            .read()
            .await
            .inserts
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Current rows of a table
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every subsequent request fail with the given status
    pub async fn fail_with(&self, status: u16) {
        self.state.write().await.fail_with = Some(status);
    }
}

impl Drop for MockStoreServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Parse `column=eq.value` pairs out of the query string
fn eq_filters(params: &HashMap<String, String>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "order" && k.as_str() != "select")
        .filter_map(|(k, v)| {
            v.strip_prefix("eq.")
                .map(|value| (k.clone(), value.to_string()))
        })
        .collect()
}

fn row_matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, expected)| {
        match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Bool(b)) => b.to_string() == *expected,
            Some(Value::Number(n)) => n.to_string() == *expected,
            _ => false,
        }
    })
}

async fn handle_select(
    State(state): State<Arc<RwLock<MockStoreState>>>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let state = state.read().await;
    if let Some(status) = state.fail_with {
        return Err(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    }

    let filters = eq_filters(&params);
    let rows = state
        .tables
        .get(&table)
        .map(|rows| {
            rows.iter()
                .filter(|row| row_matches(row, &filters))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(rows))
}

async fn handle_insert(
    State(state): State<Arc<RwLock<MockStoreState>>>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let mut state = state.write().await;
    if let Some(status) = state.fail_with {
        return Err(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    }

    let mut stored = body.clone();
    if stored.get("id").is_none() {
        let id = format!("mock-{}", state.next_id);
        state.next_id += 1;
        stored["id"] = json!(id);
    }

    state
        .inserts
        .entry(table.clone())
        .or_default()
        .push(body);
    state
        .tables
        .entry(table)
        .or_default()
        .push(stored.clone());

    Ok(Json(vec![stored]))
}

async fn handle_update(
    State(state): State<Arc<RwLock<MockStoreState>>>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let mut state = state.write().await;
    if let Some(status) = state.fail_with {
        return Err(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    }

    let filters = eq_filters(&params);
    let mut updated = Vec::new();

    if let Some(rows) = state.tables.get_mut(&table) {
        for row in rows.iter_mut() {
            if !row_matches(row, &filters) {
                continue;
            }
            if let (Some(row_obj), Some(patch_obj)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in patch_obj {
                    row_obj.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
    }

    Ok(Json(updated))
}
