//! Durable audit trails: escalation log, request records, data-dir layout

mod escalation;
mod io;
mod paths;
mod types;

pub use escalation::{
    EscalationEntry, EscalationKind, EscalationLog, EscalationStatus, Location,
};
pub use io::{append_jsonl, atomic_write, edit_jsonl, read_jsonl};
pub use paths::{Paths, HOME_ENV};
pub use types::{hash_user, RequestRecord};
