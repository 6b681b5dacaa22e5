use medtriage_core::{EntityBundle, Sentiment, Tier};
use medtriage_emergency::Restrictions;
use serde::{Deserialize, Serialize};

/// Inbound message from the host boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRequest {
    pub user_id: String,
    pub message: String,
    /// Present for emergency flows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl TriageRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Response type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Greeting,
    Acknowledgment,
    Farewell,
    FollowUp,
    Mild,
    Moderate,
    Serious,
    Emergency,
    Redirect,
    Clarify,
    Error,
}

impl ReplyKind {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Mild => ReplyKind::Mild,
            Tier::Moderate => ReplyKind::Moderate,
            Tier::Serious => ReplyKind::Serious,
            Tier::Emergency => ReplyKind::Emergency,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplyKind::Greeting => "greeting",
            ReplyKind::Acknowledgment => "acknowledgment",
            ReplyKind::Farewell => "farewell",
            ReplyKind::FollowUp => "follow_up",
            ReplyKind::Mild => "mild",
            ReplyKind::Moderate => "moderate",
            ReplyKind::Serious => "serious",
            ReplyKind::Emergency => "emergency",
            ReplyKind::Redirect => "redirect",
            ReplyKind::Clarify => "clarify",
            ReplyKind::Error => "error",
        }
    }

    /// Tiered medical branch
    pub fn is_medical(self) -> bool {
        matches!(
            self,
            ReplyKind::Mild | ReplyKind::Moderate | ReplyKind::Serious | ReplyKind::Emergency
        )
    }
}

/// Outbound payload. `response` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReply {
    pub response: String,
    /// 0 for non-medical replies, otherwise 1-4
    pub tier: u8,
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    #[serde(default)]
    pub follow_up: Vec<String>,
    #[serde(default)]
    pub quick_actions: Vec<String>,
    #[serde(default)]
    pub emergency_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Restrictions>,
    #[serde(default)]
    pub ai_enhanced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<bool>,
}

impl TriageReply {
    pub(crate) fn basic(kind: ReplyKind, tier: u8, response: String) -> Self {
        Self {
            response,
            tier,
            kind,
            follow_up: Vec::new(),
            quick_actions: Vec::new(),
            emergency_mode: false,
            restrictions: None,
            ai_enhanced: false,
            entities: None,
            sentiment: None,
            recurring: None,
        }
    }

    pub(crate) fn with_follow_up(mut self, questions: &[&str]) -> Self {
        self.follow_up = questions.iter().map(|q| q.to_string()).collect();
        self
    }

    pub(crate) fn with_quick_actions(mut self, actions: Vec<String>) -> Self {
        self.quick_actions = actions;
        self
    }

    pub fn clarify() -> Self {
        Self::basic(
            ReplyKind::Clarify,
            0,
            "Please describe your symptoms in more detail so I can help you.".to_string(),
        )
        .with_follow_up(&["Can you describe what you're feeling?"])
    }

    /// Generic reply for unrecoverable pipeline errors
    pub fn rephrase() -> Self {
        Self::basic(
            ReplyKind::Error,
            0,
            "I encountered an issue processing your message. Could you please rephrase your symptoms more clearly? For example: 'I have a fever and cough for 2 days.'".to_string(),
        )
    }

    /// Pipeline error while emergency language or an active session is involved
    pub fn emergency_failure(banner: &str) -> Self {
        let mut reply = Self::basic(
            ReplyKind::Error,
            0,
            format!(
                "{}\n\nSystem error occurred. Emergency services must be contacted directly. Do NOT rely on AI in emergency situations.",
                banner
            ),
        );
        reply.emergency_mode = true;
        reply
    }
}
