use medtriage_core::CoreError;
use medtriage_emergency::EmergencyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("lexicon: {0}")]
    Lexicon(#[from] CoreError),

    #[error("emergency: {0}")]
    Emergency(#[from] EmergencyError),
}
