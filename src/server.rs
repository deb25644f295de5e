//!
//! cbecs HTTP server
//! -----------------
//! Axum-based JSON API over the procedure catalog.
//!
//! Routes:
//! - `GET /`                         liveness text
//! - `GET /api/queries`              catalog split into charted and table-only questions
//! - `GET /api/queryData?queryId=N`  raw result of one catalog query
//! - `GET /api/view?queryId=N[&sort=field][&desc=true]`
//!                                   result plus chart description and sorted table
//!
//! Errors are returned as `{"status":"error","code","message"}` with the
//! status from `AppError::http_status`. Handler panics are caught and become
//! a 500 without taking the server task down.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

use anyhow::Context;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::backend;
use crate::catalog;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AppError, AppResult};
use crate::table::{SortDirection, SortState};
use crate::view::QueryView;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self { Self { dispatcher } }
}

/// Query string of the data endpoints. Everything is kept as text so a bad
/// value is reported by the dispatcher, not by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    #[serde(rename = "queryId")]
    pub query_id: Option<String>,
    pub sort: Option<String>,
    pub desc: Option<String>,
}

impl QueryParams {
    fn sort_state(&self) -> SortState {
        match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(col) => {
                let desc = matches!(
                    self.desc.as_deref().map(|d| d.trim().to_ascii_lowercase()).as_deref(),
                    Some("1" | "true" | "yes" | "on")
                );
                let dir = if desc { SortDirection::Descending } else { SortDirection::Ascending };
                SortState::by(col, dir)
            }
            None => SortState::unsorted(),
        }
    }
}

/// Caller address for request logs: first `x-forwarded-for` hop, else the peer.
pub struct ClientAddr(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
        Ok(ClientAddr(client_addr(&parts.headers, peer)))
    }
}

fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    forwarded
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "cbecs ok" }))
        .route("/api/queries", get(list_queries))
        .route("/api/queryData", get(query_data))
        .route("/api/view", get(query_view))
        .with_state(state)
}

/// Serve on an already bound listener. Used by `run` and by tests that bind
/// an ephemeral port.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    catalog::validate().context("procedure catalog failed validation")?;
    let backend = backend::open(&config.source)
        .await
        .with_context(|| format!("failed to open data source {}", config.source.describe()))?;
    info!(target: "startup", "data source: {}", backend.describe());
    let state = AppState::new(Dispatcher::new(backend));

    let addr: SocketAddr = config.addr().parse().with_context(|| format!("invalid bind address {}", config.addr()))?;
    info!(target: "startup", "Starting server on {}", addr);
    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind {}", addr))?;
    serve(listener, state).await
}

fn error_response(e: &AppError) -> Response {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "status": "error",
        "code": e.code_str(),
        "message": e.message(),
    });
    (status, Json(body)).into_response()
}

fn respond<T: serde::Serialize>(outcome: AppResult<T>) -> Response {
    match outcome {
        Ok(v) => (StatusCode::OK, Json(v)).into_response(),
        Err(e) => error_response(&e),
    }
}

// Convert panics to a 500 error without crashing the server task.
async fn guarded<T, F>(route: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", "HTTP {} panic: {}", route, msg);
            Err(AppError::internal("internal_panic", "internal server error"))
        }
    }
}

// A query string the extractor cannot decode (duplicate keys, bad escapes)
// is reported in the same JSON shape as every other bad request.
fn query_params(extracted: Result<Query<QueryParams>, QueryRejection>) -> AppResult<QueryParams> {
    extracted
        .map(|Query(p)| p)
        .map_err(|rej| AppError::invalid("invalid_request", rej.body_text()))
}

async fn list_queries(ClientAddr(client): ClientAddr) -> Response {
    info!(target: "http", client = %client, "GET /api/queries");
    respond(Ok(catalog::partition()))
}

async fn query_data(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    extracted: Result<Query<QueryParams>, QueryRejection>,
) -> Response {
    let params = match query_params(extracted) {
        Ok(p) => p,
        Err(e) => {
            info!(target: "http", client = %client, code = e.code_str(), "GET /api/queryData rejected");
            return error_response(&e);
        }
    };
    info!(target: "http", client = %client, query_id = ?params.query_id, "GET /api/queryData");
    let outcome = guarded("queryData", state.dispatcher.execute(params.query_id.as_deref())).await;
    respond(outcome)
}

async fn query_view(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    extracted: Result<Query<QueryParams>, QueryRejection>,
) -> Response {
    let params = match query_params(extracted) {
        Ok(p) => p,
        Err(e) => {
            info!(target: "http", client = %client, code = e.code_str(), "GET /api/view rejected");
            return error_response(&e);
        }
    };
    info!(target: "http", client = %client, query_id = ?params.query_id, sort = ?params.sort, "GET /api/view");
    let sort = params.sort_state();
    let fut = async {
        let result = state.dispatcher.execute(params.query_id.as_deref()).await?;
        QueryView::build(result, &sort)
    };
    respond(guarded("view", fut).await)
}
