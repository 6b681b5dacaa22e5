pub fn run() -> anyhow::Result<()> {
    println!("medtriage {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Symptom triage with an emergency override (lexicon v{})",
        medtriage_core::LEXICON_VERSION
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output() {
        let result = run();
        assert!(result.is_ok());
    }
}
