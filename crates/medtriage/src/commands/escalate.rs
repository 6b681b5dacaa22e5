use chrono::Utc;
use medtriage_emergency::{hospital_fallback, HospitalLookup};
use medtriage_telemetry::{EscalationEntry, EscalationKind, EscalationLog, Location, Paths};

/// Append one escalation; hospital searches with a location also get the
/// fallback lookup
pub fn escalate(
    paths: &Paths,
    emergency_number: &str,
    user_id: &str,
    session_id: &str,
    kind: EscalationKind,
    location: Option<Location>,
) -> anyhow::Result<(EscalationEntry, Option<HospitalLookup>)> {
    let log = EscalationLog::new(paths.emergency_log_file());
    let entry = EscalationEntry::new(user_id, session_id, kind, location, Utc::now());
    log.append(&entry)?;

    let lookup = match (&entry.location, kind) {
        (Some(loc), EscalationKind::HospitalSearch) => {
            Some(hospital_fallback(loc.lat, loc.lon, emergency_number))
        }
        _ => None,
    };
    Ok((entry, lookup))
}

pub fn run(
    user_id: &str,
    session_id: &str,
    kind: EscalationKind,
    coords: Option<(f64, f64)>,
    city: Option<String>,
) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let location = coords.map(|(lat, lon)| Location { lat, lon, city });

    let (entry, lookup) = escalate(
        &paths,
        &config.emergency_number,
        user_id,
        session_id,
        kind,
        location,
    )?;

    println!("{}", entry.id);
    println!("{}", config.safety_banner());
    if let Some(lookup) = lookup {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
    }
    Ok(())
}
