//! Emergency context mode: session state, output guards, escalation

mod controller;
mod error;
pub mod guard;
mod hospital;
mod prompt;

pub use controller::{Activation, EmergencyController, EmergencySession, Restrictions};
pub use error::EmergencyError;
pub use guard::{
    BannerGuard, ClosingLineGuard, GuardChain, GuardContext, GuardedText, ResponseGuard, Verdict,
};
pub use hospital::{hospital_fallback, EmergencyNumbers, HospitalLookup};
pub use prompt::{strict_emergency_prompt, CLOSING_LINE};
