use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid lexicon: {0}")]
    InvalidLexicon(String),

    #[error("unsupported lexicon version {found} (supported up to {supported})")]
    UnsupportedLexiconVersion { found: u32, supported: u32 },
}
