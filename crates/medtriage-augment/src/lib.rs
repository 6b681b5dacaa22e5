//! Optional generative augmentation of deterministic replies

mod augmenter;
mod backend;
mod error;
mod prompt;

pub use augmenter::{AugmentRequest, Augmenter};
pub use backend::{GeminiBackend, GenerativeBackend};
pub use error::AugmentError;
pub use prompt::{build_prompt, SAFETY_INSTRUCTION};
