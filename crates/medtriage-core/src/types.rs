//! Core types for triage and conversation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Severity tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    /// 1: self-care
    Mild = 1,
    /// 2: consult a doctor soon
    Moderate = 2,
    /// 3: urgent care within 24h
    Serious = 3,
    /// 4: call emergency services now
    Emergency = 4,
}

impl Tier {
    /// Map an explicit 1-10 self-report. Out-of-range values are clamped first,
    /// so this path never yields `Emergency`.
    pub fn from_self_report(value: u64) -> Self {
        match value.clamp(1, 10) {
            1..=3 => Tier::Mild,
            4..=6 => Tier::Moderate,
            _ => Tier::Serious,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Tier::Mild),
            2 => Some(Tier::Moderate),
            3 => Some(Tier::Serious),
            4 => Some(Tier::Emergency),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Response type tag for the medical branch
    pub fn label(self) -> &'static str {
        match self {
            Tier::Mild => "mild",
            Tier::Moderate => "moderate",
            Tier::Serious => "serious",
            Tier::Emergency => "emergency",
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.level()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Tier::from_level(level).ok_or_else(|| format!("tier out of range: {}", level))
    }
}

/// Classified user intent. Declaration order of the lexicon's intent table
/// decides ties, not this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    SymptomQuery,
    Emergency,
    Medication,
    Appointment,
    FollowUp,
    Gratitude,
    Farewell,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::SymptomQuery => "symptom_query",
            Intent::Emergency => "emergency",
            Intent::Medication => "medication",
            Intent::Appointment => "appointment",
            Intent::FollowUp => "follow_up",
            Intent::Gratitude => "gratitude",
            Intent::Farewell => "farewell",
            Intent::Unknown => "unknown",
        }
    }

    /// Intents that imply a health complaint even without extracted entities
    pub fn is_medical(self) -> bool {
        matches!(
            self,
            Intent::SymptomQuery | Intent::Emergency | Intent::Medication
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Anxious,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Anxious => "anxious",
        }
    }
}

/// Self-described severity adjective found in the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityWord {
    Mild,
    Moderate,
    Severe,
}

impl SeverityWord {
    pub fn as_str(self) -> &'static str {
        match self {
            SeverityWord::Mild => "mild",
            SeverityWord::Moderate => "moderate",
            SeverityWord::Severe => "severe",
        }
    }
}

/// Entities pulled out of a single message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBundle {
    /// Ordered by vocabulary order, no duplicates
    pub symptoms: Vec<String>,
    pub duration: Option<String>,
    pub severity: Option<SeverityWord>,
    pub body_parts: Vec<String>,
    /// Reserved; the extractor does not populate it yet
    #[serde(default)]
    pub medications: Vec<String>,
}

impl EntityBundle {
    pub fn has_medical_signal(&self) -> bool {
        !self.symptoms.is_empty() || self.severity.is_some() || !self.body_parts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message metadata: known keys are typed, anything else goes in `extra`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A stored conversation message. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMeta,
}

/// Per-user conversation context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub severity: Option<SeverityWord>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ConversationContext {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.severity.is_none() && self.extra.is_empty()
    }

    /// Fold in whatever the latest message carried
    pub fn merge_entities(&mut self, entities: &EntityBundle) {
        if !entities.symptoms.is_empty() {
            self.symptoms = entities.symptoms.clone();
        }
        if let Some(word) = entities.severity {
            self.severity = Some(word);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub messages: VecDeque<Message>,
    pub context: ConversationContext,
    pub last_updated: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            context: ConversationContext::default(),
            last_updated: Utc::now(),
        }
    }
}

impl Default for ConversationRecord {
    fn default() -> Self {
        Self::new()
    }
}
