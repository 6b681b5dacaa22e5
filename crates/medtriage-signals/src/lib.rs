//! Deterministic signal extraction from free-text messages

mod entities;
mod intent;
mod sentiment;

pub use entities::EntityExtractor;
pub use intent::{IntentClassifier, IntentMatch};
pub use sentiment::SentimentAnalyzer;
