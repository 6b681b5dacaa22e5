#![allow(dead_code)]

use async_trait::async_trait;
use medtriage_augment::{AugmentError, Augmenter, GenerativeBackend};
use medtriage_core::{Config, EntityBundle, Lexicon, SeverityClassifier, Tier};
use medtriage_engine::Engine;
use medtriage_telemetry::EscalationLog;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BANNER: &str = "🚨 CALL 112 IMMEDIATELY";

pub fn sample_config() -> Config {
    Config {
        audit_requests: false,
        ..Config::new()
    }
}

pub fn engine(dir: &TempDir) -> Engine {
    engine_with(dir, sample_config())
}

pub fn engine_with(dir: &TempDir, config: Config) -> Engine {
    Engine::with_lexicon(
        config,
        Lexicon::builtin(),
        EscalationLog::new(dir.path().join("emergency_log.jsonl")),
    )
}

pub fn augmented(dir: &TempDir, backend: impl GenerativeBackend + 'static) -> Engine {
    engine(dir).with_augmenter(Augmenter::new(Arc::new(backend), Duration::from_millis(200)))
}

/// Classifier that ignores its input
pub struct FixedTier(pub Tier);

impl SeverityClassifier for FixedTier {
    fn classify(&self, _text: &str, _entities: &EntityBundle) -> Tier {
        self.0
    }
}

/// Backend that always answers with the same text
pub struct Canned(pub &'static str);

#[async_trait]
impl GenerativeBackend for Canned {
    async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
        Ok(self.0.to_string())
    }
}

pub struct Failing;

#[async_trait]
impl GenerativeBackend for Failing {
    async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
        Err(AugmentError::Http { status: 503 })
    }
}

pub struct Slow;

#[async_trait]
impl GenerativeBackend for Slow {
    async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("late".to_string())
    }
}
