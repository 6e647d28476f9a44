//! HTTP server: axum router over the calculation engine and SQLite store.
//!
//! Owner identity is resolved per request from headers: `x-user-id` wins
//! over `x-session-key`, and with neither the shared anonymous session is
//! used. Each request runs synchronously end to end; the store is the only
//! shared mutable resource and is serialized behind a mutex.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use kalc_core::matrix::clean_matrix;
use kalc_core::{
    calculate, format_result, is_memory_action, CalcRequest, HistoryQuery, HistoryStore,
    KalcError, MemoryOp, OwnerId, PreferencesPatch, PreferencesStore,
};
use kalc_store::SqliteStore;

use crate::types::*;

/// Session key assigned when a request carries no identity headers.
const ANONYMOUS_SESSION: &str = "anonymous";

pub struct AppState {
    store: Mutex<SqliteStore>,
}

impl AppState {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, SqliteStore>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError(KalcError::Database("store lock poisoned".into())))
    }
}

/// Build the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/api/calculate", post(handle_calculate))
        .route(
            "/api/preferences",
            get(handle_get_preferences).post(handle_update_preferences),
        )
        .route("/api/history", get(handle_history))
        .route("/api/history/clear", post(handle_clear_history))
        .route("/api/memory", post(handle_memory))
        .route("/api/export/history", get(handle_export_history))
        .route("/api/export/settings", get(handle_export_settings))
        .route("/api/import/settings", post(handle_import_settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the TCP listener and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "kalc server listening");
    axum::serve(listener, router(state)).await
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Request-boundary error wrapper. Every failure renders as a 400 with the
/// uniform `{ error, success: false }` body.
pub struct ApiError(KalcError);

impl From<KalcError> for ApiError {
    fn from(err: KalcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: self.0.to_string(),
                success: false,
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Owner resolution
// ---------------------------------------------------------------------------

fn resolve_owner(headers: &HeaderMap) -> OwnerId {
    if let Some(id) = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
    {
        return OwnerId::User(id);
    }
    if let Some(key) = headers.get("x-session-key").and_then(|v| v.to_str().ok()) {
        if !key.is_empty() {
            return OwnerId::Session(key.to_string());
        }
    }
    OwnerId::Session(ANONYMOUS_SESSION.to_string())
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_calculate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let store = state.store()?;
    let prefs = store.get_or_create(&owner)?;

    // Memory-register actions update the stored value and skip history.
    if is_memory_action(&req.action) {
        let action = req.action.trim_start_matches("memory_");
        let value = Decimal::from_str(req.expression.trim()).ok();
        let op = MemoryOp::from_action(action, value).map_err(KalcError::InvalidInput)?;
        let memory_value = store.apply_memory_op(&owner, &op)?;
        return Ok(Json(CalculateResponse {
            result: Value::String(memory_value.to_string()),
            expression: req.expression,
            success: true,
        }));
    }

    let calc_req = CalcRequest {
        expression: req.expression.clone(),
        kind: req.kind,
        action: req.action.clone(),
        matrix_data: req.matrix_data.as_deref().map(clean_matrix),
    };
    let value = calculate(&calc_req, &prefs)?;
    let result = format_result(&value, prefs.decimal_places, req.kind);

    let stored = match &result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    store.append(&owner, &req.expression, &stored, req.kind)?;

    Ok(Json(CalculateResponse {
        result,
        expression: req.expression,
        success: true,
    }))
}

async fn handle_get_preferences(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let preferences = state.store()?.get_or_create(&owner)?;
    Ok(Json(PreferencesResponse {
        success: true,
        preferences,
    }))
}

async fn handle_update_preferences(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(patch): Json<PreferencesPatch>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let preferences = state.store()?.update(&owner, &patch)?;
    Ok(Json(PreferencesResponse {
        success: true,
        preferences,
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    search: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let defaults = HistoryQuery::default();
    let query = HistoryQuery {
        search: params.search,
        page: params.page.unwrap_or(defaults.page),
        per_page: params.per_page.unwrap_or(defaults.per_page),
    };
    let page = state.store()?.list(&owner, &query)?;
    Ok(Json(HistoryResponse {
        success: true,
        page,
    }))
}

async fn handle_clear_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let deleted_count = state.store()?.clear(&owner)?;
    Ok(Json(ClearHistoryResponse {
        success: true,
        deleted_count,
    }))
}

async fn handle_memory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<MemoryRequest>,
) -> Result<Json<Value>, ApiError> {
    let owner = resolve_owner(&headers);
    let op = MemoryOp::from_action(&req.action, req.value).map_err(KalcError::InvalidInput)?;
    let memory_value = state.store()?.apply_memory_op(&owner, &op)?;

    let mut body = json!({
        "success": true,
        "memory_value": memory_value.to_string(),
    });
    if req.action == "recall" {
        body["value"] = Value::String(memory_value.to_string());
    }
    Ok(Json(body))
}

async fn handle_export_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let owner = resolve_owner(&headers);
    let entries = state.store()?.export_all(&owner)?;

    let mut csv = String::from("Expression,Result,Type,Date\n");
    for entry in &entries {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&entry.expression),
            csv_field(&entry.result),
            entry.kind,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"calculation_history.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

async fn handle_export_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let owner = resolve_owner(&headers);
    let preferences = state.store()?.get_or_create(&owner)?;
    let body = serde_json::to_string_pretty(&preferences).map_err(KalcError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"calculator_settings.json\"",
            ),
        ],
        body,
    )
        .into_response())
}

async fn handle_import_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(patch): Json<ImportSettingsRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let owner = resolve_owner(&headers);
    let preferences = state.store()?.update(&owner, &patch)?;
    Ok(Json(PreferencesResponse {
        success: true,
        preferences,
    }))
}
