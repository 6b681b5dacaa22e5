//! Core triage types, keyword lexicons, conversation store and severity tiering

mod config;
mod error;
mod lexicon;
mod severity;
mod store;
mod types;

pub use config::{AugmentationConfig, Config};
pub use error::CoreError;
pub use lexicon::{
    IntentKeywords, Lexicon, RiskCategory, RiskGroup, SentimentLexicon, SeverityGroup,
    LEXICON_VERSION,
};
pub use severity::{
    parse_self_report, EmergencyGate, RiskHit, RuleClassifier, SeverityAssessment,
    SeverityClassifier, SeverityMapper, TierSource,
};
pub use store::{ConversationStore, ConversationSummary, DEFAULT_MAX_HISTORY};
pub use types::{
    ConversationContext, ConversationRecord, EntityBundle, Intent, Message, MessageMeta, Role,
    Sentiment, SeverityWord, Tier,
};
