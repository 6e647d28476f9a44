use rust_decimal::Decimal;

use crate::error::KalcResult;
use crate::types::{
    CalcKind, HistoryEntry, HistoryPage, HistoryQuery, MemoryOp, OwnerId, Preferences,
    PreferencesPatch,
};

/// Append-only calculation history, scoped by owner identity.
pub trait HistoryStore {
    fn append(
        &self,
        owner: &OwnerId,
        expression: &str,
        result: &str,
        kind: CalcKind,
    ) -> KalcResult<i64>;

    /// Paginated, search-filtered listing ordered by recency.
    fn list(&self, owner: &OwnerId, query: &HistoryQuery) -> KalcResult<HistoryPage>;

    /// Bulk delete by owner. Returns the number of deleted entries.
    fn clear(&self, owner: &OwnerId) -> KalcResult<usize>;

    /// Full recency-ordered listing, for export.
    fn export_all(&self, owner: &OwnerId) -> KalcResult<Vec<HistoryEntry>>;
}

/// Per-owner preferences, at most one record per owner identity.
pub trait PreferencesStore {
    /// Fetch the owner's record, creating it with defaults on first access.
    fn get_or_create(&self, owner: &OwnerId) -> KalcResult<Preferences>;

    /// Apply a partial update. Last write wins.
    fn update(&self, owner: &OwnerId, patch: &PreferencesPatch) -> KalcResult<Preferences>;

    /// Apply a memory-register operation and return the resulting value.
    fn apply_memory_op(&self, owner: &OwnerId, op: &MemoryOp) -> KalcResult<Decimal>;
}
