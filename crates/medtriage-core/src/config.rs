//! Configuration for the triage engine

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generative backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Augmentation is opt-in; the deterministic text is always available
    pub enabled: bool,

    pub model: String,

    /// Base URL of the generateContent REST API
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Hard cap on a single backend call
    pub timeout_secs: u64,

    pub temperature: f64,

    pub max_output_tokens: u32,
}

impl AugmentationConfig {
    pub fn new() -> Self {
        Self {
            enabled: false,
            model: "gemini-1.5-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 20,
            temperature: 0.1,
            max_output_tokens: 2048,
        }
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Max messages kept per user (oldest evicted first)
    pub max_history: usize,

    /// Messages handed to the response generator
    pub history_window: usize,

    /// Stored messages scanned for recurring symptoms
    pub recurrence_window: usize,

    /// Number printed in emergency text and the mandated banner
    pub emergency_number: String,

    /// Versioned lexicon resource; built-in tables when unset
    pub lexicon_path: Option<PathBuf>,

    /// Append a privacy-safe record per request
    pub audit_requests: bool,

    /// Window for the symptom pattern alert
    pub pattern_window_days: u32,

    /// Expire emergency sessions after this many seconds (unbounded when unset)
    pub emergency_session_ttl_secs: Option<u64>,

    pub augmentation: AugmentationConfig,
}

impl Config {
    pub fn new() -> Self {
        Self {
            max_history: crate::store::DEFAULT_MAX_HISTORY,
            history_window: 5,
            recurrence_window: 3,
            emergency_number: "112".to_string(),
            lexicon_path: None,
            audit_requests: true,
            pattern_window_days: 7,
            emergency_session_ttl_secs: None,
            augmentation: AugmentationConfig::new(),
        }
    }

    /// Load from a JSON file. A missing file means defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Literal every emergency-mode response must contain
    pub fn safety_banner(&self) -> String {
        format!("🚨 CALL {} IMMEDIATELY", self.emergency_number)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
