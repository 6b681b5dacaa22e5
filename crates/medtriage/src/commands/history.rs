use medtriage_telemetry::{EscalationEntry, EscalationLog, EscalationStatus, Paths};

fn format_entry(entry: &EscalationEntry) -> String {
    let status = match entry.status {
        EscalationStatus::Active => "ACTIVE",
        EscalationStatus::Resolved => "resolved",
    };
    let place = match &entry.location {
        Some(loc) => match &loc.city {
            Some(city) => format!(" @ {} ({:.4},{:.4})", city, loc.lat, loc.lon),
            None => format!(" @ {:.4},{:.4}", loc.lat, loc.lon),
        },
        None => String::new(),
    };
    format!(
        "  {} | {} | {} | session:{} | {}{}",
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.id,
        entry.kind.as_str(),
        entry.session_id,
        status,
        place
    )
}

/// Newest first
fn select(entries: &[EscalationEntry], limit: usize, active_only: bool) -> Vec<&EscalationEntry> {
    entries
        .iter()
        .rev()
        .filter(|e| !active_only || e.status == EscalationStatus::Active)
        .take(limit)
        .collect()
}

pub fn run(limit: usize, active_only: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let entries = EscalationLog::new(paths.emergency_log_file()).entries()?;

    if entries.is_empty() {
        println!("No escalations logged");
        return Ok(());
    }

    let shown = select(&entries, limit, active_only);
    println!("Escalations (showing {} of {})", shown.len(), entries.len());
    println!("======================");
    for entry in shown {
        println!("{}", format_entry(entry));
    }
    Ok(())
}
