//! Request/response types for the HTTP API.
//!
//! Serialized as JSON. The calculate endpoint mirrors the wire shape
//! expected by the web frontend: `type` selects the calculation kind and
//! `action` distinguishes plain evaluation from matrix operations and
//! memory-register actions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kalc_core::{CalcKind, HistoryPage, Preferences, PreferencesPatch};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// One calculation request. Matrix cells arrive as raw JSON values; the
/// grid is lenient, so empty strings and nulls coerce to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub expression: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: CalcKind,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub matrix_data: Option<Vec<Vec<Value>>>,
}

fn default_kind() -> CalcKind {
    CalcKind::Basic
}

fn default_action() -> String {
    "calculate".to_string()
}

/// Formatted calculation result. `result` keeps structure for matrix and
/// graph payloads and is a plain string for scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub result: Value,
    pub expression: String,
    pub success: bool,
}

/// Preferences record together with the success flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub success: bool,
    #[serde(flatten)]
    pub preferences: Preferences,
}

/// History listing with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: HistoryPage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub deleted_count: usize,
}

/// Memory-register request: `value` is required for store/add/subtract and
/// ignored for recall/clear.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRequest {
    pub action: String,
    #[serde(default)]
    pub value: Option<Decimal>,
}

/// Uniform error body. Every request-boundary failure renders as this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub success: bool,
}

/// Settings import body, applied as a partial preferences patch.
pub type ImportSettingsRequest = PreferencesPatch;
