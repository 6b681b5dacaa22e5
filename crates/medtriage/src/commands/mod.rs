pub mod chat;
pub mod escalate;
pub mod history;
pub mod lexicon;
pub mod pattern;
pub mod serve;
pub mod version;

use anyhow::Context;
use medtriage_core::Config;
use medtriage_engine::Engine;
use medtriage_telemetry::Paths;

/// Config from `<data_dir>/config.json`; missing means defaults
pub fn load_config(paths: &Paths) -> anyhow::Result<Config> {
    let path = paths.config_file();
    Config::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub fn load_engine() -> anyhow::Result<(Engine, Paths)> {
    let paths = Paths::new()?;
    let config = load_config(&paths)?;
    let engine = Engine::new(config, &paths).context("failed to start triage engine")?;
    Ok((engine, paths))
}
