use crate::pattern::SymptomPattern;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct SymptomEntry {
    pub user_id: String,
    pub symptoms: Vec<String>,
    pub tier: u8,
    pub timestamp: DateTime<Utc>,
}

/// SQLite-backed log of symptom reports per user
pub struct SymptomLog {
    conn: Connection,
}

impl SymptomLog {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS symptom_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                symptoms TEXT NOT NULL,
                tier INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_symptom_user ON symptom_log(user_id, timestamp);
            ",
        )?;
        Ok(())
    }

    pub fn record(&self, entry: &SymptomEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO symptom_log (user_id, symptoms, tier, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.user_id,
                serde_json::to_string(&entry.symptoms)?,
                entry.tier,
                timestamp_key(entry.timestamp),
            ],
        )?;
        Ok(())
    }

    pub fn count(&self, user_id: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM symptom_log WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Entries strictly after `since`, oldest first
    pub fn entries_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<SymptomEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, symptoms, tier, timestamp FROM symptom_log
             WHERE user_id = ?1 AND timestamp > ?2
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user_id, timestamp_key(since)], |row| {
            let symptoms: String = row.get(1)?;
            let timestamp: String = row.get(3)?;
            Ok((row.get::<_, String>(0)?, symptoms, row.get::<_, u8>(2)?, timestamp))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (user_id, symptoms, tier, timestamp) = row?;
            entries.push(SymptomEntry {
                user_id,
                symptoms: serde_json::from_str(&symptoms)
                    .context("symptom list is not a JSON array")?,
                tier,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .context("bad timestamp in symptom_log")?
                    .with_timezone(&Utc),
            });
        }
        Ok(entries)
    }

    /// Summarize a user's reports over the last `days` days. A window
    /// reaching past the representable calendar covers all history.
    pub fn pattern(&self, user_id: &str, days: u32, now: DateTime<Utc>) -> Result<SymptomPattern> {
        if self.count(user_id)? == 0 {
            return Ok(SymptomPattern::no_data());
        }
        let since = TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let recent = self.entries_since(user_id, since)?;
        Ok(SymptomPattern::from_entries(&recent))
    }
}

/// Fixed-width UTC form so SQL string comparison orders chronologically
fn timestamp_key(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternKind, SeverityTrend};
    use tempfile::TempDir;

    fn entry(user: &str, symptoms: &[&str], tier: u8, at: DateTime<Utc>) -> SymptomEntry {
        SymptomEntry {
            user_id: user.to_string(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            tier,
            timestamp: at,
        }
    }

    #[test]
    fn test_record_and_read_back() {
        let log = SymptomLog::in_memory().unwrap();
        let now = Utc::now();
        log.record(&entry("u1", &["fever", "cough"], 2, now)).unwrap();
        log.record(&entry("u2", &["rash"], 1, now)).unwrap();

        let entries = log.entries_since("u1", now - TimeDelta::hours(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symptoms, vec!["fever", "cough"]);
        assert_eq!(entries[0].tier, 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("symptoms.db");
        {
            let log = SymptomLog::open(&path).unwrap();
            log.record(&entry("u1", &["fever"], 1, Utc::now())).unwrap();
        }
        let log = SymptomLog::open(&path).unwrap();
        assert_eq!(log.count("u1").unwrap(), 1);
    }

    #[test]
    fn test_pattern_with_unbounded_window() {
        let log = SymptomLog::in_memory().unwrap();
        let now = Utc::now();
        log.record(&entry("u1", &["rash"], 1, now - TimeDelta::days(400)))
            .unwrap();
        log.record(&entry("u1", &["rash"], 1, now)).unwrap();

        let pattern = log.pattern("u1", u32::MAX, now).unwrap();
        assert_eq!(pattern.frequency, 2);
        assert_eq!(pattern.most_common_symptoms[0], ("rash".to_string(), 2));
    }

    #[test]
    fn test_pattern_no_data_and_no_recent() {
        let log = SymptomLog::in_memory().unwrap();
        let now = Utc::now();
        assert_eq!(log.pattern("u1", 7, now).unwrap().pattern, PatternKind::NoData);

        log.record(&entry("u1", &["fever"], 1, now - TimeDelta::days(30)))
            .unwrap();
        assert_eq!(
            log.pattern("u1", 7, now).unwrap().pattern,
            PatternKind::NoRecentData
        );
    }

    #[test]
    fn test_pattern_recurring_over_window() {
        let log = SymptomLog::in_memory().unwrap();
        let now = Utc::now();
        for (i, tier) in [1u8, 1, 2, 2].iter().enumerate() {
            log.record(&entry(
                "u1",
                &["headache", "nausea"],
                *tier,
                now - TimeDelta::hours(10 - i as i64),
            ))
            .unwrap();
        }

        let pattern = log.pattern("u1", 7, now).unwrap();
        assert_eq!(pattern.pattern, PatternKind::Recurring);
        assert_eq!(pattern.frequency, 4);
        assert_eq!(pattern.severity_trend, Some(SeverityTrend::Increasing));
        assert_eq!(pattern.most_common_symptoms[0], ("headache".to_string(), 4));
    }
}
