//! Persistent symptom history and pattern analysis

mod pattern;
mod symptom_log;

pub use pattern::{PatternKind, SeverityTrend, SymptomPattern};
pub use symptom_log::{SymptomEntry, SymptomLog};
