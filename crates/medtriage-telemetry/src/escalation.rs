//! Append-only escalation log

use crate::io::{append_jsonl, edit_jsonl, read_jsonl};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    /// Direct call to the emergency number
    #[serde(alias = "call_112")]
    CallEmergency,
    HospitalSearch,
    EmergencyChat,
}

impl EscalationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EscalationKind::CallEmergency => "call_emergency",
            EscalationKind::HospitalSearch => "hospital_search",
            EscalationKind::EmergencyChat => "emergency_chat",
        }
    }
}

impl FromStr for EscalationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call_emergency" | "call_112" => Ok(EscalationKind::CallEmergency),
            "hospital_search" => Ok(EscalationKind::HospitalSearch),
            "emergency_chat" => Ok(EscalationKind::EmergencyChat),
            other => Err(format!("unknown escalation type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: EscalationKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<Location>,
    pub status: EscalationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EscalationEntry {
    pub fn new(
        user_id: &str,
        session_id: &str,
        kind: EscalationKind,
        location: Option<Location>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: escalation_id(user_id, now),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            kind,
            timestamp: now,
            location,
            status: EscalationStatus::Active,
            updated_at: None,
        }
    }
}

/// `EMG_<YYYYmmdd_HHMMSS>_<first 8 chars of user id>`
fn escalation_id(user_id: &str, now: DateTime<Utc>) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("EMG_{}_{}", now.format("%Y%m%d_%H%M%S"), prefix)
}

/// JSONL-backed log. Entries are only ever appended, except that resolving
/// a session rewrites the status of that session's lines in place.
///
/// Clones share one write lock, so an append never lands between the read
/// and the rename of a resolve.
#[derive(Debug, Clone)]
pub struct EscalationLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl EscalationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, entry: &EscalationEntry) -> std::io::Result<()> {
        {
            let _writes = self.lock_writes();
            append_jsonl(&self.path, entry)?;
        }
        info!(
            id = %entry.id,
            kind = entry.kind.as_str(),
            "escalation logged"
        );
        Ok(())
    }

    pub fn entries(&self) -> std::io::Result<Vec<EscalationEntry>> {
        read_jsonl(&self.path)
    }

    pub fn active(&self) -> std::io::Result<Vec<EscalationEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.status == EscalationStatus::Active)
            .collect())
    }

    /// Mark every active entry of `session_id` resolved. Returns how many
    /// changed. Lines this build cannot parse, or whose type it does not
    /// know, still resolve when their session matches; anything else is
    /// written back untouched.
    pub fn resolve_session(&self, session_id: &str, now: DateTime<Utc>) -> std::io::Result<usize> {
        let updated_at = serde_json::to_value(now)?;
        let _writes = self.lock_writes();

        edit_jsonl(&self.path, |line| {
            let mut value: serde_json::Value = serde_json::from_str(line).ok()?;
            let record = value.as_object_mut()?;
            if record.get("session_id")?.as_str()? != session_id
                || record.get("status")?.as_str()? != "active"
            {
                return None;
            }
            record.insert("status".to_string(), "resolved".into());
            record.insert("updated_at".to_string(), updated_at.clone());
            serde_json::to_string(&value).ok()
        })
    }
}
