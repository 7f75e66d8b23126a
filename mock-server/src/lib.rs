//! A fake upstream JSON API: a read-only package registry plus endpoints that
//! misbehave on purpose (bad JSON, wrong shape, arbitrary status codes).

use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Size of the `blob` string served by `/large`.
pub const LARGE_BODY_LEN: usize = 64 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub downloads: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

pub type Registry = Arc<HashMap<String, Package>>;

pub fn registry() -> Registry {
    let packages = [
        ("serde", "1.0.210", 412_000_000, Some("MIT OR Apache-2.0")),
        ("tokio", "1.40.0", 230_000_000, Some("MIT")),
        ("left-pad", "0.0.3", 12, None),
    ];
    let map = packages
        .into_iter()
        .map(|(name, version, downloads, license)| {
            let package = Package {
                name: name.to_string(),
                version: version.to_string(),
                downloads,
                license: license.map(str::to_string),
            };
            (name.to_string(), package)
        })
        .collect();
    Arc::new(map)
}

pub fn app() -> Router {
    Router::new()
        .route("/packages/{name}", get(get_package))
        .route("/search", get(search))
        .route("/headers", get(echo_headers))
        .route("/status/{code}", get(status))
        .route("/malformed", get(malformed))
        .route("/mismatch", get(mismatch))
        .route("/large", get(large))
        .with_state(registry())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_package(
    State(registry): State<Registry>,
    Path(name): Path<String>,
) -> Result<Json<Package>, (StatusCode, Json<Value>)> {
    registry.get(&name).cloned().map(Json).ok_or_else(|| {
        tracing::debug!(%name, "unknown package");
        (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
    })
}

async fn search(State(registry): State<Registry>, Query(params): Query<SearchParams>) -> Json<Vec<Package>> {
    let mut hits: Vec<Package> = registry
        .values()
        .filter(|p| p.name.contains(&params.q))
        .cloned()
        .collect();
    hits.sort_by(|a, b| a.name.cmp(&b.name));
    Json(hits)
}

/// Echo request headers as a JSON object keyed by lowercase name.
async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let echoed = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(echoed)
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "status": status.as_u16() })))
}

async fn malformed() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        "<html><body>upstream is having a bad day</body></html>",
    )
}

async fn mismatch() -> Json<Value> {
    Json(json!({ "name": 7, "downloads": "many" }))
}

async fn large() -> Json<Value> {
    Json(json!({ "blob": "x".repeat(LARGE_BODY_LEN) }))
}
