use chrono::Utc;
use medtriage_records::SymptomLog;
use medtriage_telemetry::Paths;

pub fn run(user_id: &str, days: u32) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let log = SymptomLog::open(&paths.symptom_db())?;
    let pattern = log.pattern(user_id, days, Utc::now())?;

    println!("{}", serde_json::to_string_pretty(&pattern)?);
    if let Some(alert) = pattern.alert(days) {
        println!();
        println!("{}", alert);
    }
    Ok(())
}
