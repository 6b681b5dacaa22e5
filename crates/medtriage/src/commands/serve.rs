//! JSON-lines front end. Each stdin line is either a triage request
//! (`{"user_id", "message", "session_id"?}`) or an operation tagged with
//! `op`; each gets exactly one JSON line back on stdout.

use medtriage_engine::{Engine, TriageRequest};
use medtriage_telemetry::{EscalationKind, Location};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

fn default_kind() -> EscalationKind {
    EscalationKind::CallEmergency
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Operation {
    Escalate {
        user_id: String,
        session_id: String,
        #[serde(rename = "type", default = "default_kind")]
        kind: EscalationKind,
        #[serde(default)]
        location: Option<Location>,
    },
    Deactivate {
        session_id: String,
    },
    Summary {
        user_id: String,
    },
    Hospitals {
        lat: f64,
        lon: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Input {
    Op(Operation),
    Triage(TriageRequest),
}

fn failure(message: impl std::fmt::Display) -> Value {
    json!({ "success": false, "error": message.to_string() })
}

/// One reply line for one input line
pub async fn respond(engine: &Engine, line: &str) -> Value {
    let input: Input = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => return failure(format!("invalid request: {}", e)),
    };

    match input {
        Input::Triage(request) => {
            let reply = engine.handle(&request).await;
            serde_json::to_value(&reply).unwrap_or_else(failure)
        }
        Input::Op(Operation::Escalate {
            user_id,
            session_id,
            kind,
            location,
        }) => match engine.escalate(&user_id, &session_id, kind, location) {
            Ok(entry) => json!({
                "success": true,
                "escalation_id": entry.id,
                "emergency_number": engine.config().emergency_number,
                "message": engine.config().safety_banner(),
            }),
            Err(e) => failure(e),
        },
        Input::Op(Operation::Deactivate { session_id }) => match engine.deactivate(&session_id) {
            Ok(found) => json!({ "success": found, "session_id": session_id }),
            Err(e) => failure(e),
        },
        Input::Op(Operation::Summary { user_id }) => match engine.summary(&user_id) {
            Some(summary) => serde_json::to_value(&summary).unwrap_or_else(failure),
            None => json!({ "summary": "No conversation history" }),
        },
        Input::Op(Operation::Hospitals { lat, lon }) => {
            serde_json::to_value(engine.hospitals(lat, lon)).unwrap_or_else(failure)
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let (engine, paths) = super::load_engine()?;
    info!(
        data_dir = %paths.data_dir().display(),
        augmentation = engine.augmentation_enabled(),
        "serving JSON lines on stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = respond(&engine, &line).await;
        let mut buf = serde_json::to_vec(&reply)?;
        buf.push(b'\n');
        stdout.write_all(&buf).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medtriage_core::{Config, Lexicon};
    use medtriage_telemetry::EscalationLog;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> Engine {
        Engine::with_lexicon(
            Config::new(),
            Lexicon::builtin(),
            EscalationLog::new(dir.path().join("emergency_log.jsonl")),
        )
    }

    #[tokio::test]
    async fn test_triage_line() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let out = respond(
            &e,
            r#"{"user_id":"u1","message":"I have had fever and cough for 3 days"}"#,
        )
        .await;
        assert_eq!(out["type"], "moderate");
        assert_eq!(out["tier"], 2);
        assert_eq!(out["emergency_mode"], false);
        assert_eq!(out["entities"]["duration"], "3 days");
    }

    #[tokio::test]
    async fn test_escalate_then_deactivate() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);

        let out = respond(
            &e,
            r#"{"op":"escalate","user_id":"u1","session_id":"s1","type":"call_112","location":{"lat":1.5,"lon":2.5}}"#,
        )
        .await;
        assert_eq!(out["success"], true);
        assert!(out["escalation_id"].as_str().unwrap().starts_with("EMG_"));
        assert_eq!(out["message"], "🚨 CALL 112 IMMEDIATELY");

        let out = respond(&e, r#"{"op":"deactivate","session_id":"s1"}"#).await;
        assert_eq!(out["success"], true);
        let out = respond(&e, r#"{"op":"deactivate","session_id":"nope"}"#).await;
        assert_eq!(out["success"], false);
    }

    #[tokio::test]
    async fn test_summary_before_and_after() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);

        let out = respond(&e, r#"{"op":"summary","user_id":"u1"}"#).await;
        assert_eq!(out["summary"], "No conversation history");

        respond(&e, r#"{"user_id":"u1","message":"mild headache"}"#).await;
        let out = respond(&e, r#"{"op":"summary","user_id":"u1"}"#).await;
        assert_eq!(out["total_messages"], 2);
        assert_eq!(out["main_symptoms"][0], "headache");
        assert_eq!(out["last_severity"], "mild");
    }

    #[tokio::test]
    async fn test_hospitals_and_bad_input() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);

        let out = respond(&e, r#"{"op":"hospitals","lat":10.0,"lon":20.0}"#).await;
        assert_eq!(out["status"], "fallback");

        let out = respond(&e, "not json").await;
        assert_eq!(out["success"], false);
        let out = respond(&e, r#"{"op":"teleport"}"#).await;
        assert_eq!(out["success"], false);
    }
}
