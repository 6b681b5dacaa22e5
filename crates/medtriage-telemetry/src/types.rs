//! Request audit records

use chrono::{DateTime, Utc};
use medtriage_core::{Intent, RiskCategory};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One handled request. Holds no message text and no raw user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: DateTime<Utc>,
    pub user_hash: String,
    pub intent: Intent,
    /// 0 for non-medical and clarification replies
    pub tier: u8,
    #[serde(default)]
    pub severity_input: Option<u64>,
    #[serde(default)]
    pub risk_detected: bool,
    #[serde(default)]
    pub risk_category: Option<RiskCategory>,
    #[serde(default)]
    pub ai_enhanced: bool,
    #[serde(default)]
    pub emergency_mode: bool,
    #[serde(default)]
    pub message_chars: usize,
}

/// First 16 hex chars of the SHA-256 of the user id
pub fn hash_user(user_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(user_id.as_bytes()));
    digest[..16].to_string()
}
