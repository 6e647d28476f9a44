pub mod engine;
pub mod error;
pub mod eval;
pub mod format;
pub mod matrix;
pub mod normalize;
pub mod parser;
pub mod sampler;
pub mod store;
pub mod token;
pub mod types;
pub mod value;

pub use engine::{calculate, CalcRequest};
pub use error::{KalcError, KalcResult};
pub use eval::Evaluator;
pub use format::{format_number, format_result};
pub use matrix::MatrixOp;
pub use store::{HistoryStore, PreferencesStore};
pub use types::{
    is_memory_action, AngleUnit, CalcKind, HistoryEntry, HistoryPage, HistoryQuery, MemoryOp,
    OwnerId, Preferences, PreferencesPatch, MEMORY_ACTIONS,
};
pub use value::{CalcValue, EvalOutcome, GraphSeries, Sentinel};
