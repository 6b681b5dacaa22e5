//! Request pipeline and deterministic response generation

mod engine;
mod error;
mod reply;
mod responder;

pub use engine::Engine;
pub use error::EngineError;
pub use reply::{ReplyKind, TriageReply, TriageRequest};
pub use responder::{Responder, Turn};
