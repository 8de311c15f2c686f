use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What the server saw for a request sent to `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hits {
    pub hits: u64,
}

pub type Counter = Arc<AtomicU64>;

pub fn app() -> Router {
    let counter: Counter = Arc::new(AtomicU64::new(0));
    Router::new()
        .route("/echo", any(echo))
        .route("/cookies", get(show_cookies))
        .route("/cookies/set", get(set_cookies))
        .route("/status/{code}", any(status))
        .route("/redirect", get(redirect))
        .route("/hits", get(hits))
        .with_state(counter)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn show_cookies(headers: HeaderMap) -> Json<serde_json::Value> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(serde_json::json!({ "cookie": cookie }))
}

/// Every query pair becomes its own `Set-Cookie` line scoped to `/`.
async fn set_cookies(Query(pairs): Query<HashMap<String, String>>) -> impl IntoResponse {
    let lines: Vec<_> = pairs
        .iter()
        .map(|(name, value)| (header::SET_COOKIE, format!("{name}={value}; Path=/")))
        .collect();
    (AppendHeaders(lines), Json(pairs))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn redirect() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, "hop=1; Path=/")]),
        Redirect::to("/echo"),
    )
}

async fn hits(State(counter): State<Counter>) -> Json<Hits> {
    let hits = counter.fetch_add(1, Ordering::SeqCst) + 1;
    Json(Hits { hits })
}
