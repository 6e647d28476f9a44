use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::debug;

use kalc_core::{
    CalcKind, HistoryEntry, HistoryPage, HistoryQuery, HistoryStore, KalcError, KalcResult,
    MemoryOp, OwnerId, Preferences, PreferencesPatch, PreferencesStore,
};

use crate::schema::init_db;

/// Listing page size cap.
const MAX_PER_PAGE: u32 = 100;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> KalcResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KalcError::Database(format!("cannot create db directory: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| KalcError::Database(format!("cannot open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| KalcError::Database(e.to_string()))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> KalcResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| KalcError::Database(format!("cannot open in-memory db: {e}")))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const HISTORY_COLS: &str = "id, expression, result, kind, created_at";

/// Escape LIKE metacharacters so a search for "100%" or "x_2" matches
/// those characters literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
    let kind_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        expression: row.get(1)?,
        result: row.get(2)?,
        kind: kind_str.parse().unwrap_or(CalcKind::Basic),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_preferences(row: &rusqlite::Row) -> rusqlite::Result<Preferences> {
    let angle_str: String = row.get(2)?;
    let memory_str: String = row.get(3)?;
    Ok(Preferences {
        theme: row.get(0)?,
        decimal_places: row.get(1)?,
        angle_unit: angle_str.parse().unwrap_or(kalc_core::AngleUnit::Radians),
        memory_value: Decimal::from_str(&memory_str).unwrap_or(Decimal::ZERO),
    })
}

// ---------------------------------------------------------------------------
// HistoryStore impl
// ---------------------------------------------------------------------------

impl HistoryStore for SqliteStore {
    fn append(
        &self,
        owner: &OwnerId,
        expression: &str,
        result: &str,
        kind: CalcKind,
    ) -> KalcResult<i64> {
        self.conn
            .execute(
                "INSERT INTO history (owner, expression, result, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    owner.to_string(),
                    expression,
                    result,
                    kind.to_string(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| KalcError::Database(e.to_string()))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn list(&self, owner: &OwnerId, query: &HistoryQuery) -> KalcResult<HistoryPage> {
        let per_page = query.per_page.clamp(1, MAX_PER_PAGE);
        let pattern = query
            .search
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let (count_sql, page_sql) = if pattern.is_some() {
            let w = "owner = ?1 AND (expression LIKE ?2 ESCAPE '\\' OR result LIKE ?2 ESCAPE '\\')";
            (
                format!("SELECT COUNT(*) FROM history WHERE {w}"),
                format!(
                    "SELECT {HISTORY_COLS} FROM history WHERE {w}
                     ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
                ),
            )
        } else {
            let w = "owner = ?1";
            (
                format!("SELECT COUNT(*) FROM history WHERE {w}"),
                format!(
                    "SELECT {HISTORY_COLS} FROM history WHERE {w}
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ),
            )
        };

        let owner_key = owner.to_string();
        let total_count: u64 = match &pattern {
            Some(p) => self
                .conn
                .query_row(&count_sql, params![owner_key, p], |row| row.get(0)),
            None => self
                .conn
                .query_row(&count_sql, params![owner_key], |row| row.get(0)),
        }
        .map_err(|e| KalcError::Database(e.to_string()))?;

        // Out-of-range pages clamp to the last page; an empty result set
        // still reports one (empty) page.
        let total_pages = (total_count.div_ceil(per_page as u64)).max(1) as u32;
        let current_page = query.page.clamp(1, total_pages);
        let offset = (current_page - 1) as i64 * per_page as i64;

        let mut stmt = self
            .conn
            .prepare(&page_sql)
            .map_err(|e| KalcError::Database(e.to_string()))?;

        let rows = match &pattern {
            Some(p) => stmt.query_map(
                params![owner_key, p, per_page as i64, offset],
                row_to_entry,
            ),
            None => stmt.query_map(params![owner_key, per_page as i64, offset], row_to_entry),
        }
        .map_err(|e| KalcError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| KalcError::Database(e.to_string()))?);
        }

        Ok(HistoryPage {
            entries,
            total_count,
            total_pages,
            current_page,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        })
    }

    fn clear(&self, owner: &OwnerId) -> KalcResult<usize> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM history WHERE owner = ?1",
                params![owner.to_string()],
            )
            .map_err(|e| KalcError::Database(e.to_string()))?;
        debug!(owner = %owner, deleted, "cleared history");
        Ok(deleted)
    }

    fn export_all(&self, owner: &OwnerId) -> KalcResult<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {HISTORY_COLS} FROM history WHERE owner = ?1
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|e| KalcError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![owner.to_string()], row_to_entry)
            .map_err(|e| KalcError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| KalcError::Database(e.to_string()))?);
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// PreferencesStore impl
// ---------------------------------------------------------------------------

const PREFS_COLS: &str = "theme, decimal_places, angle_unit, memory_value";

impl PreferencesStore for SqliteStore {
    fn get_or_create(&self, owner: &OwnerId) -> KalcResult<Preferences> {
        let owner_key = owner.to_string();

        let existing = self
            .conn
            .prepare(&format!(
                "SELECT {PREFS_COLS} FROM preferences WHERE owner = ?1"
            ))
            .and_then(|mut stmt| {
                stmt.query_row(params![owner_key], row_to_preferences)
                    .optional()
            })
            .map_err(|e| KalcError::Database(e.to_string()))?;

        if let Some(prefs) = existing {
            return Ok(prefs);
        }

        let defaults = Preferences::default();
        // A concurrent first access may have inserted already; the unique
        // owner index makes this a no-op in that case.
        self.conn
            .execute(
                "INSERT OR IGNORE INTO preferences (owner, theme, decimal_places, angle_unit, memory_value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    owner_key,
                    defaults.theme,
                    defaults.decimal_places,
                    defaults.angle_unit.to_string(),
                    defaults.memory_value.to_string(),
                ],
            )
            .map_err(|e| KalcError::Database(e.to_string()))?;
        debug!(owner = %owner, "created default preferences");

        Ok(defaults)
    }

    fn update(&self, owner: &OwnerId, patch: &PreferencesPatch) -> KalcResult<Preferences> {
        let mut prefs = self.get_or_create(owner)?;

        if let Some(theme) = &patch.theme {
            prefs.theme = theme.clone();
        }
        if let Some(places) = patch.decimal_places {
            prefs.decimal_places = places;
        }
        if let Some(unit) = patch.angle_unit {
            prefs.angle_unit = unit;
        }
        if let Some(memory) = patch.memory_value {
            prefs.memory_value = memory;
        }

        self.save_preferences(owner, &prefs)?;
        Ok(prefs)
    }

    fn apply_memory_op(&self, owner: &OwnerId, op: &MemoryOp) -> KalcResult<Decimal> {
        let mut prefs = self.get_or_create(owner)?;

        let value = match op {
            MemoryOp::Store(v) => *v,
            MemoryOp::Recall => return Ok(prefs.memory_value),
            MemoryOp::Clear => Decimal::ZERO,
            MemoryOp::Add(v) => prefs.memory_value + *v,
            MemoryOp::Subtract(v) => prefs.memory_value - *v,
        };

        prefs.memory_value = value;
        self.save_preferences(owner, &prefs)?;
        Ok(value)
    }
}

impl SqliteStore {
    fn save_preferences(&self, owner: &OwnerId, prefs: &Preferences) -> KalcResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE preferences SET
                 theme = ?2, decimal_places = ?3, angle_unit = ?4, memory_value = ?5
                 WHERE owner = ?1",
                params![
                    owner.to_string(),
                    prefs.theme,
                    prefs.decimal_places,
                    prefs.angle_unit.to_string(),
                    prefs.memory_value.to_string(),
                ],
            )
            .map_err(|e| KalcError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(KalcError::NotFound(format!("preferences for {owner}")));
        }
        Ok(())
    }
}
