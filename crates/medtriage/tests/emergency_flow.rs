mod common;

use common::{engine, engine_with, sample_config, BANNER};
use medtriage_emergency::{Restrictions, CLOSING_LINE};
use medtriage_engine::{ReplyKind, TriageRequest};
use medtriage_telemetry::{EscalationKind, EscalationLog, EscalationStatus, Location};
use tempfile::TempDir;

fn log(dir: &TempDir) -> EscalationLog {
    EscalationLog::new(dir.path().join("emergency_log.jsonl"))
}

#[tokio::test]
async fn test_gate_to_escalation_to_resolution() {
    let dir = TempDir::new().unwrap();
    let e = engine(&dir);

    let reply = e
        .handle(&TriageRequest::new("alice-1234567", "I think this is a heart attack").with_session("s1"))
        .await;
    assert_eq!(reply.kind, ReplyKind::Emergency);
    assert!(reply.emergency_mode);
    assert_eq!(reply.restrictions, Some(Restrictions::STRICT));
    assert!(reply.response.starts_with(BANNER));
    assert!(reply.response.ends_with(CLOSING_LINE));
    assert!(e.is_emergency_active("s1"));

    let entry = e
        .escalate(
            "alice-1234567",
            "s1",
            EscalationKind::CallEmergency,
            Some(Location {
                lat: 12.97,
                lon: 77.59,
                city: Some("Bengaluru".to_string()),
            }),
        )
        .unwrap();
    assert!(entry.id.starts_with("EMG_"));
    assert!(entry.id.ends_with("_alice-12"));
    assert_eq!(entry.status, EscalationStatus::Active);

    // A direct button press needs no prior activation
    e.escalate("bob", "s2", EscalationKind::HospitalSearch, None)
        .unwrap();
    assert!(!e.is_emergency_active("s2"));
    assert_eq!(log(&dir).active().unwrap().len(), 2);

    assert!(e.deactivate("s1").unwrap());
    assert!(!e.is_emergency_active("s1"));

    let entries = log(&dir).entries().unwrap();
    let s1 = entries.iter().find(|x| x.session_id == "s1").unwrap();
    let s2 = entries.iter().find(|x| x.session_id == "s2").unwrap();
    assert_eq!(s1.status, EscalationStatus::Resolved);
    assert!(s1.updated_at.is_some());
    assert_eq!(s2.status, EscalationStatus::Active);
}

#[tokio::test]
async fn test_unknown_session_deactivation_is_a_quiet_noop() {
    let dir = TempDir::new().unwrap();
    let e = engine(&dir);
    assert!(!e.deactivate("never-seen").unwrap());
    assert!(!e.deactivate("").unwrap());
}

#[tokio::test]
async fn test_restart_drops_sessions_but_keeps_log() {
    let dir = TempDir::new().unwrap();
    {
        let e = engine(&dir);
        e.handle(&TriageRequest::new("u1", "he collapsed").with_session("s1"))
            .await;
        e.escalate("u1", "s1", EscalationKind::EmergencyChat, None)
            .unwrap();
        assert!(e.is_emergency_active("s1"));
    }

    let e = engine(&dir);
    assert!(!e.is_emergency_active("s1"));
    assert!(!e.has_conversation("u1"));
    assert_eq!(log(&dir).active().unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_ttl_expires_emergency_mode() {
    let dir = TempDir::new().unwrap();
    let config = medtriage_core::Config {
        emergency_session_ttl_secs: Some(0),
        ..sample_config()
    };
    let e = engine_with(&dir, config);

    let first = e
        .handle(&TriageRequest::new("u1", "severe allergic reaction").with_session("s1"))
        .await;
    assert!(first.emergency_mode);

    let second = e
        .handle(&TriageRequest::new("u1", "hello").with_session("s1"))
        .await;
    assert!(!second.emergency_mode);
    assert_eq!(second.kind, ReplyKind::Greeting);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let dir = TempDir::new().unwrap();
    let e = engine(&dir);

    e.handle(&TriageRequest::new("u1", "he took too much of his pills").with_session("a"))
        .await;
    let other = e
        .handle(&TriageRequest::new("u2", "hello").with_session("b"))
        .await;
    assert!(e.is_emergency_active("a"));
    assert!(!e.is_emergency_active("b"));
    assert!(!other.emergency_mode);
    assert!(!other.response.contains(BANNER));
}

#[tokio::test]
async fn test_hospital_lookup_is_a_fallback() {
    let dir = TempDir::new().unwrap();
    let e = engine(&dir);
    let lookup = e.hospitals(12.5, -3.25);
    assert_eq!(lookup.status, "fallback");
    assert_eq!(lookup.emergency_numbers.primary, "112");
    assert!(lookup.fallback_url.contains("12.5"));
}
