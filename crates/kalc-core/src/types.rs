use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Owner identity
// ---------------------------------------------------------------------------

/// Scope key for history and preferences: an authenticated user id or an
/// anonymous session key. Resolved once per request by the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerId {
    User(i64),
    Session(String),
}

impl OwnerId {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }

    pub fn session_key(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Session(key) => Some(key),
        }
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Session(key) => write!(f, "session:{key}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcKind {
    Basic,
    Scientific,
    Matrix,
    Graph,
}

impl fmt::Display for CalcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Scientific => write!(f, "scientific"),
            Self::Matrix => write!(f, "matrix"),
            Self::Graph => write!(f, "graph"),
        }
    }
}

impl std::str::FromStr for CalcKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "scientific" => Ok(Self::Scientific),
            "matrix" => Ok(Self::Matrix),
            "graph" => Ok(Self::Graph),
            _ => Err(format!("invalid calculation type: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Angle unit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleUnit {
    #[serde(rename = "rad")]
    Radians,
    #[serde(rename = "deg")]
    Degrees,
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radians => write!(f, "rad"),
            Self::Degrees => write!(f, "deg"),
        }
    }
}

impl std::str::FromStr for AngleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rad" | "radians" => Ok(Self::Radians),
            "deg" | "degrees" => Ok(Self::Degrees),
            _ => Err(format!("invalid angle unit: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub decimal_places: u32,
    pub angle_unit: AngleUnit,
    pub memory_value: Decimal,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            decimal_places: 10,
            angle_unit: AngleUnit::Radians,
            memory_value: Decimal::ZERO,
        }
    }
}

/// Partial update applied to a stored preferences record. Absent fields
/// keep their current value; last write wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    pub theme: Option<String>,
    pub decimal_places: Option<u32>,
    pub angle_unit: Option<AngleUnit>,
    pub memory_value: Option<Decimal>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.decimal_places.is_none()
            && self.angle_unit.is_none()
            && self.memory_value.is_none()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// A single stored calculation. Append-only; ordered by creation time
/// descending when listed.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub expression: String,
    pub result: String,
    #[serde(rename = "type")]
    pub kind: CalcKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub total_count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

// ---------------------------------------------------------------------------
// Memory register
// ---------------------------------------------------------------------------

/// Operations on the persistent memory value. Values are exact decimals
/// threaded through explicitly rather than a process-wide precision context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOp {
    Store(Decimal),
    Recall,
    Clear,
    Add(Decimal),
    Subtract(Decimal),
}

impl MemoryOp {
    pub fn from_action(action: &str, value: Option<Decimal>) -> Result<Self, String> {
        let value = value.unwrap_or(Decimal::ZERO);
        match action {
            "store" => Ok(Self::Store(value)),
            "recall" => Ok(Self::Recall),
            "clear" => Ok(Self::Clear),
            "add" => Ok(Self::Add(value)),
            "subtract" => Ok(Self::Subtract(value)),
            other => Err(format!("unknown memory action: {other}")),
        }
    }
}

/// Calculate-endpoint actions that operate on the memory register instead
/// of producing a history entry.
pub const MEMORY_ACTIONS: &[&str] = &[
    "memory_store",
    "memory_recall",
    "memory_clear",
    "memory_add",
    "memory_subtract",
];

pub fn is_memory_action(action: &str) -> bool {
    MEMORY_ACTIONS.contains(&action)
}
