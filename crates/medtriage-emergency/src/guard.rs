//! Post-generation guards for emergency-mode replies.
//!
//! Guards run in registration order and each sees the output of the one
//! before it. A guard never rejects text; it either passes it through or
//! returns a corrected version.

use crate::prompt::CLOSING_LINE;
use tracing::warn;

/// Values the guards check against
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    /// Mandated banner literal, e.g. `🚨 CALL 112 IMMEDIATELY`
    pub banner: &'a str,
}

/// A guard either passes text through or hands back a rewrite
pub enum Verdict {
    Pass(String),
    Corrected(String),
}

pub trait ResponseGuard: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, text: String, ctx: &GuardContext<'_>) -> Verdict;
}

/// Prepends the canonical banner paragraph when the banner literal is missing
pub struct BannerGuard;

impl ResponseGuard for BannerGuard {
    fn name(&self) -> &str {
        "banner"
    }

    fn check(&self, text: String, ctx: &GuardContext<'_>) -> Verdict {
        if text.contains(ctx.banner) {
            return Verdict::Pass(text);
        }
        Verdict::Corrected(format!(
            "{}\n\nThis is a potential emergency situation. Professional emergency services are the ONLY appropriate response.\n\n{}",
            ctx.banner,
            text.trim_start()
        ))
    }
}

/// Appends the closing line when the reply does not carry it
pub struct ClosingLineGuard;

impl ResponseGuard for ClosingLineGuard {
    fn name(&self) -> &str {
        "closing_line"
    }

    fn check(&self, text: String, _ctx: &GuardContext<'_>) -> Verdict {
        if text.contains(CLOSING_LINE) {
            return Verdict::Pass(text);
        }
        let body = text.trim_end();
        Verdict::Corrected(format!("{}\n\n{}", body, CLOSING_LINE))
    }
}

/// Output of a guard chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedText {
    pub text: String,
    /// Names of guards that rewrote the text
    pub corrected_by: Vec<String>,
}

impl GuardedText {
    pub fn was_corrected(&self) -> bool {
        !self.corrected_by.is_empty()
    }
}

pub struct GuardChain {
    guards: Vec<Box<dyn ResponseGuard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Banner first, then the closing line
    pub fn emergency() -> Self {
        let mut chain = Self::new();
        chain.register(Box::new(BannerGuard));
        chain.register(Box::new(ClosingLineGuard));
        chain
    }

    pub fn register(&mut self, guard: Box<dyn ResponseGuard>) {
        self.guards.push(guard);
    }

    pub fn apply(&self, mut text: String, ctx: &GuardContext<'_>) -> GuardedText {
        let mut corrected_by = Vec::new();
        for guard in &self.guards {
            text = match guard.check(text, ctx) {
                Verdict::Pass(unchanged) => unchanged,
                Verdict::Corrected(corrected) => {
                    warn!(guard = guard.name(), "emergency reply corrected");
                    corrected_by.push(guard.name().to_string());
                    corrected
                }
            };
        }
        GuardedText { text, corrected_by }
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Default for GuardChain {
    fn default() -> Self {
        Self::emergency()
    }
}
