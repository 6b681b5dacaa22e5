use medtriage_core::Lexicon;
use medtriage_telemetry::Paths;

/// Configured lexicon resource, or the built-in tables
pub fn effective_lexicon(paths: &Paths) -> anyhow::Result<Lexicon> {
    let config = super::load_config(paths)?;
    match &config.lexicon_path {
        Some(path) => Ok(Lexicon::load(path)?),
        None => Ok(Lexicon::builtin()),
    }
}

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let lexicon = effective_lexicon(&paths)?;
    println!("{}", lexicon.to_json_pretty()?);
    Ok(())
}
