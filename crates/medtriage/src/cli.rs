use clap::{Parser, Subcommand};
use medtriage_telemetry::EscalationKind;

#[derive(Parser)]
#[command(name = "medtriage")]
#[command(version)]
#[command(about = "Symptom triage assistant with an emergency override")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive triage conversation
    Chat {
        /// User id the conversation is stored under
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Emergency session id (generated if omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// JSON-lines loop: one request per stdin line, one reply per stdout line
    Serve,

    /// Log a direct emergency escalation
    Escalate {
        #[arg(long)]
        user: String,

        #[arg(long)]
        session: String,

        /// call_emergency, hospital_search or emergency_chat
        #[arg(long, default_value = "call_emergency")]
        kind: EscalationKind,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[arg(long)]
        city: Option<String>,
    },

    /// Show a user's symptom pattern
    Pattern {
        #[arg(long)]
        user: String,

        /// Window in days
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// View the escalation log
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only unresolved escalations
        #[arg(long)]
        active: bool,
    },

    /// Print the effective lexicon as JSON
    Lexicon,

    /// Print version information
    Version,
}
