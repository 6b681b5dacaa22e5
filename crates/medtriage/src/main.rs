mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries replies; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { user, session } => commands::chat::run(&user, session).await,
        Commands::Serve => commands::serve::run().await,
        Commands::Escalate {
            user,
            session,
            kind,
            lat,
            lon,
            city,
        } => commands::escalate::run(&user, &session, kind, lat.zip(lon), city),
        Commands::Pattern { user, days } => commands::pattern::run(&user, days),
        Commands::History { limit, active } => commands::history::run(limit, active),
        Commands::Lexicon => commands::lexicon::run(),
        Commands::Version => commands::version::run(),
    }
}
