use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmergencyError {
    #[error("escalation log I/O failed: {0}")]
    Log(#[from] std::io::Error),
}
