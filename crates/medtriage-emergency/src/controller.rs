//! Per-session emergency state machine.
//!
//! A session is INACTIVE until `activate`, then ACTIVE until `deactivate`
//! (or expiry, when a TTL is configured). Escalations can be logged for any
//! session at any time; they are tracked alongside the session so that
//! deactivation resolves them.

use crate::error::EmergencyError;
use crate::guard::{GuardChain, GuardContext, GuardedText};
use crate::hospital::{hospital_fallback, HospitalLookup};
use crate::prompt::strict_emergency_prompt;
use chrono::{DateTime, TimeDelta, Utc};
use medtriage_core::RiskCategory;
use medtriage_telemetry::{EscalationEntry, EscalationKind, EscalationLog, Location};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// Fixed restriction set applied to every active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    pub no_diagnosis: bool,
    pub no_treatment: bool,
    pub no_reassurance: bool,
    pub prioritize_escalation: bool,
    pub safety_only: bool,
}

impl Restrictions {
    pub const STRICT: Restrictions = Restrictions {
        no_diagnosis: true,
        no_treatment: true,
        no_reassurance: true,
        prioritize_escalation: true,
        safety_only: true,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencySession {
    pub session_id: String,
    /// Set while the session is in emergency context mode
    pub activated_at: Option<DateTime<Utc>>,
    pub trigger: Option<RiskCategory>,
    pub escalation_ids: Vec<String>,
    pub last_seen: DateTime<Utc>,
}

impl EmergencySession {
    fn new(session_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            activated_at: None,
            trigger: None,
            escalation_ids: Vec::new(),
            last_seen: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.activated_at.is_some()
    }
}

/// Returned by `activate`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activation {
    pub strict_prompt: String,
    pub restrictions: Restrictions,
    pub activated_at: DateTime<Utc>,
    /// False when the session was already active
    pub newly_activated: bool,
}

pub struct EmergencyController {
    sessions: Mutex<HashMap<String, EmergencySession>>,
    log: EscalationLog,
    emergency_number: String,
    ttl: Option<TimeDelta>,
    guards: GuardChain,
}

impl EmergencyController {
    pub fn new(emergency_number: &str, log: EscalationLog) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            log,
            emergency_number: emergency_number.to_string(),
            ttl: None,
            guards: GuardChain::emergency(),
        }
    }

    /// A TTL too large to represent is treated as no TTL
    pub fn with_ttl(mut self, ttl_secs: Option<u64>) -> Self {
        self.ttl = ttl_secs
            .and_then(|s| i64::try_from(s).ok())
            .and_then(TimeDelta::try_seconds);
        self
    }

    pub fn with_guards(mut self, guards: GuardChain) -> Self {
        self.guards = guards;
        self
    }

    pub fn banner(&self) -> String {
        format!("🚨 CALL {} IMMEDIATELY", self.emergency_number)
    }

    pub fn strict_prompt(&self) -> String {
        strict_emergency_prompt(&self.emergency_number)
    }

    pub fn log(&self) -> &EscalationLog {
        &self.log
    }

    /// INACTIVE -> ACTIVE. Activating an active session refreshes it.
    pub fn activate(&self, session_id: &str, trigger: Option<RiskCategory>) -> Activation {
        let now = Utc::now();
        let mut sessions = self.sessions(now);
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| EmergencySession::new(session_id, now));

        session.last_seen = now;
        if trigger.is_some() {
            session.trigger = trigger;
        }
        let newly_activated = session.activated_at.is_none();
        let activated_at = *session.activated_at.get_or_insert(now);

        if newly_activated {
            info!(
                session = session_id,
                trigger = trigger.map(|c| c.as_str()).unwrap_or("none"),
                "emergency context activated"
            );
        }

        Activation {
            strict_prompt: self.strict_prompt(),
            restrictions: Restrictions::STRICT,
            activated_at,
            newly_activated,
        }
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions(Utc::now())
            .get(session_id)
            .is_some_and(EmergencySession::is_active)
    }

    pub fn session(&self, session_id: &str) -> Option<EmergencySession> {
        self.sessions(Utc::now()).get(session_id).cloned()
    }

    pub fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions(Utc::now())
            .values()
            .filter(|s| s.is_active())
            .map(|s| s.session_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Append an escalation entry. Works with or without a prior activation.
    pub fn escalate(
        &self,
        user_id: &str,
        session_id: &str,
        kind: EscalationKind,
        location: Option<Location>,
    ) -> Result<EscalationEntry, EmergencyError> {
        let now = Utc::now();
        let entry = EscalationEntry::new(user_id, session_id, kind, location, now);
        self.log.append(&entry)?;

        let mut sessions = self.sessions(now);
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| EmergencySession::new(session_id, now));
        session.escalation_ids.push(entry.id.clone());
        session.last_seen = now;

        Ok(entry)
    }

    /// ACTIVE -> INACTIVE. Resolves the session's log entries and forgets
    /// the session. `Ok(false)` when the session is unknown.
    pub fn deactivate(&self, session_id: &str) -> Result<bool, EmergencyError> {
        let now = Utc::now();
        let removed = self.sessions(now).remove(session_id);
        if removed.is_none() {
            return Ok(false);
        }

        let resolved = self.log.resolve_session(session_id, now)?;
        info!(session = session_id, resolved, "emergency context deactivated");
        Ok(true)
    }

    /// Enforce the emergency output contract on a reply
    pub fn validate(&self, text: String) -> GuardedText {
        let banner = self.banner();
        self.guards.apply(text, &GuardContext { banner: &banner })
    }

    pub fn hospitals(&self, lat: f64, lon: f64) -> HospitalLookup {
        hospital_fallback(lat, lon, &self.emergency_number)
    }

    /// Forget every session; the log is untouched
    pub fn reset(&self) {
        self.sessions(Utc::now()).clear();
    }

    // Entries are replaced whole, so a poisoned map is still consistent.
    fn sessions(&self, now: DateTime<Utc>) -> MutexGuard<'_, HashMap<String, EmergencySession>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ttl) = self.ttl {
            sessions.retain(|id, s| {
                let keep = s
                    .last_seen
                    .checked_add_signed(ttl)
                    .map_or(true, |expires| expires > now);
                if !keep {
                    info!(session = %id, "emergency session expired");
                }
                keep
            });
        }
        sessions
    }
}
