//! Wraps a generative backend with a timeout, cancellation and output
//! checks. Callers treat every error as "keep the template reply".

use crate::backend::{GeminiBackend, GenerativeBackend};
use crate::error::AugmentError;
use crate::prompt::build_prompt;
use medtriage_core::AugmentationConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Inputs for one augmentation call
#[derive(Debug, Clone, Copy)]
pub struct AugmentRequest<'a> {
    pub message: &'a str,
    pub symptoms: &'a [String],
    pub tier: u8,
    /// Replaces the safety instruction while an emergency session is active
    pub override_prompt: Option<&'a str>,
    pub context_line: Option<&'a str>,
    /// Literal the emergency contract asks the model to lead with
    pub banner: &'a str,
}

/// Bounded, cancellable call into a generative backend. Any `Err` means the
/// caller keeps its deterministic text.
#[derive(Clone)]
pub struct Augmenter {
    backend: Option<Arc<dyn GenerativeBackend>>,
    timeout: Duration,
}

impl Augmenter {
    pub fn new(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_secs(0),
        }
    }

    /// Disabled unless enabled in config and an API key is present
    pub fn from_config(config: &AugmentationConfig) -> Result<Self, AugmentError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let backend = GeminiBackend::from_config(config)?;
        Ok(Self::new(
            Arc::new(backend),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn augment(
        &self,
        request: AugmentRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, AugmentError> {
        let backend = self.backend.as_ref().ok_or(AugmentError::Disabled)?;
        if cancel.is_cancelled() {
            return Err(AugmentError::Cancelled);
        }

        let prompt = build_prompt(&request);
        debug!(
            backend = backend.name(),
            prompt_chars = prompt.len(),
            emergency = request.override_prompt.is_some(),
            "calling generative backend"
        );

        let call = tokio::time::timeout(self.timeout, backend.generate(&prompt));
        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(AugmentError::Cancelled),
            res = call => match res {
                Ok(inner) => inner?,
                Err(_) => return Err(AugmentError::Timeout(self.timeout.as_secs())),
            },
        };

        if text.trim().is_empty() {
            return Err(AugmentError::EmptyOutput);
        }
        Ok(text)
    }
}
