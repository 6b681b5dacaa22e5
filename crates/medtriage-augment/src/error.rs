use thiserror::Error;

/// Every variant means "keep the deterministic text"
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("augmentation disabled")]
    Disabled,

    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("backend timed out after {0}s")]
    Timeout(u64),

    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("backend returned empty output")]
    EmptyOutput,

    #[error("malformed backend response: {0}")]
    Malformed(String),
}
