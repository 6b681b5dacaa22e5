//! The request pipeline.
//!
//! Stage order is fixed: emergency gate, signal extraction, tier resolution,
//! deterministic response, optional augmentation, emergency guards, then the
//! conversation store append. Requests for one user are serialized; requests
//! for different users only contend on the short store critical sections.
//! A panic inside a turn is contained to that turn: the caller gets the
//! failure reply and shared state stays usable for the next request.

use crate::error::EngineError;
use crate::reply::{ReplyKind, TriageReply, TriageRequest};
use crate::responder::{Responder, Turn};
use chrono::Utc;
use futures::FutureExt;
use medtriage_augment::{AugmentRequest, Augmenter};
use medtriage_core::{
    Config, ConversationContext, ConversationStore, ConversationSummary, EntityBundle, Intent,
    Lexicon, Message, MessageMeta, Role, Sentiment, SeverityClassifier, SeverityMapper, Tier,
    TierSource,
};
use medtriage_emergency::{EmergencyController, HospitalLookup, Restrictions};
use medtriage_records::{SymptomEntry, SymptomLog, SymptomPattern};
use medtriage_signals::{EntityExtractor, IntentClassifier, SentimentAnalyzer};
use medtriage_telemetry::{
    append_jsonl, hash_user, EscalationEntry, EscalationKind, EscalationLog, Location, Paths,
    RequestRecord,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct Engine {
    config: Config,
    lexicon: Arc<Lexicon>,
    intents: IntentClassifier,
    extractor: EntityExtractor,
    sentiment: SentimentAnalyzer,
    mapper: SeverityMapper,
    responder: Responder,
    store: Mutex<ConversationStore>,
    user_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    augmenter: Augmenter,
    emergency: EmergencyController,
    symptom_log: Option<Mutex<SymptomLog>>,
    requests_file: Option<PathBuf>,
}

impl Engine {
    /// Build from config, with every file under `paths`. Optional
    /// collaborators that fail to come up (symptom database, generative
    /// backend) are logged and left out; a bad lexicon is an error.
    pub fn new(config: Config, paths: &Paths) -> Result<Self, EngineError> {
        let lexicon = match &config.lexicon_path {
            Some(path) => Lexicon::load(path)?,
            None => Lexicon::builtin(),
        };

        let augmenter = match Augmenter::from_config(&config.augmentation) {
            Ok(augmenter) => augmenter,
            Err(e) => {
                warn!(error = %e, "augmentation unavailable, replies stay deterministic");
                Augmenter::disabled()
            }
        };

        let symptom_log = match SymptomLog::open(&paths.symptom_db()) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "symptom log unavailable, pattern alerts disabled");
                None
            }
        };

        let requests_file = config.audit_requests.then(|| paths.requests_file());
        let log = EscalationLog::new(paths.emergency_log_file());

        let mut engine = Self::assemble(config, Arc::new(lexicon), log);
        engine.augmenter = augmenter;
        engine.symptom_log = symptom_log.map(Mutex::new);
        engine.requests_file = requests_file;
        Ok(engine)
    }

    /// Deterministic engine: no augmentation, no symptom log, no audit file
    pub fn with_lexicon(config: Config, lexicon: Lexicon, log: EscalationLog) -> Self {
        Self::assemble(config, Arc::new(lexicon), log)
    }

    fn assemble(config: Config, lexicon: Arc<Lexicon>, log: EscalationLog) -> Self {
        let emergency = EmergencyController::new(&config.emergency_number, log)
            .with_ttl(config.emergency_session_ttl_secs);
        Self {
            intents: IntentClassifier::new(lexicon.clone()),
            extractor: EntityExtractor::new(lexicon.clone()),
            sentiment: SentimentAnalyzer::new(lexicon.clone()),
            mapper: SeverityMapper::new(lexicon.clone()),
            responder: Responder::new(&config.emergency_number, config.recurrence_window),
            store: Mutex::new(ConversationStore::new(config.max_history)),
            user_locks: Mutex::new(HashMap::new()),
            augmenter: Augmenter::disabled(),
            emergency,
            symptom_log: None,
            requests_file: None,
            lexicon,
            config,
        }
    }

    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = augmenter;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn SeverityClassifier>) -> Self {
        self.mapper = SeverityMapper::with_classifier(self.lexicon.clone(), classifier);
        self
    }

    pub fn with_symptom_log(mut self, log: SymptomLog) -> Self {
        self.symptom_log = Some(Mutex::new(log));
        self
    }

    pub fn with_request_audit(mut self, path: impl Into<PathBuf>) -> Self {
        self.requests_file = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn augmentation_enabled(&self) -> bool {
        self.augmenter.is_enabled()
    }

    pub async fn handle(&self, request: &TriageRequest) -> TriageReply {
        self.handle_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Never fails and never returns an empty response. Cancelling `cancel`
    /// only abandons augmentation; the deterministic reply is still returned.
    pub async fn handle_with_cancel(
        &self,
        request: &TriageRequest,
        cancel: &CancellationToken,
    ) -> TriageReply {
        let slot = self.user_slot(&request.user_id);
        let _turn = slot.lock.lock().await;

        let outcome = AssertUnwindSafe(self.process(request, cancel))
            .catch_unwind()
            .await;
        match outcome {
            Ok(reply) => reply,
            Err(_) => {
                error!("triage pipeline panicked");
                let in_emergency = self.mapper.gate(&request.message).is_some()
                    || request
                        .session_id
                        .as_deref()
                        .is_some_and(|s| self.emergency.is_active(s));
                if in_emergency {
                    TriageReply::emergency_failure(&self.config.safety_banner())
                } else {
                    TriageReply::rephrase()
                }
            }
        }
    }

    async fn process(&self, request: &TriageRequest, cancel: &CancellationToken) -> TriageReply {
        let user_id = request.user_id.as_str();
        let message = request.message.trim();
        if message.is_empty() {
            return TriageReply::clarify();
        }

        let risk = self.mapper.gate(message);
        let entities = self.extractor.extract(message);
        let intent = self.intents.classify(message).intent;
        let sentiment = self.sentiment.analyze(message);
        let assessment = self.mapper.resolve(risk, message, &entities);
        let forced = assessment.is_override();

        let tier = if assessment.source == TierSource::Classifier
            && self.is_non_medical(message, intent, &entities)
        {
            0
        } else {
            assessment.tier.level()
        };

        let session = request.session_id.as_deref();
        let mut emergency_mode = forced;
        if let Some(session_id) = session {
            if forced {
                self.emergency
                    .activate(session_id, assessment.risk.as_ref().map(|hit| hit.category));
            } else {
                emergency_mode = self.emergency.is_active(session_id);
            }
        }

        let (history, context) = {
            let mut store = self.lock_store();
            let history = store.recent(user_id, self.config.history_window);
            store.context_mut(user_id).merge_entities(&entities);
            (history, store.get_context(user_id))
        };

        let mut reply = self.responder.respond(&Turn {
            intent,
            entities: &entities,
            sentiment,
            history: &history,
            context: &context,
            tier,
            forced_emergency: forced,
        });

        if self.augmenter.is_enabled() && (reply.kind.is_medical() || emergency_mode) {
            self.augment(&mut reply, message, &entities, sentiment, &history, emergency_mode, cancel)
                .await;
        }

        if emergency_mode || reply.tier == Tier::Emergency.level() {
            let guarded = self.emergency.validate(std::mem::take(&mut reply.response));
            reply.response = guarded.text;
        }
        if emergency_mode {
            reply.emergency_mode = true;
            reply.restrictions = Some(Restrictions::STRICT);
        }

        if reply.kind.is_medical() && !forced && !entities.symptoms.is_empty() {
            let alert = self.track_symptoms(user_id, &entities.symptoms, reply.tier);
            if let Some(alert) = alert.filter(|_| !emergency_mode && reply.tier < 4) {
                reply.response.push_str("\n\n");
                reply.response.push_str(&alert);
            }
        }

        {
            let mut store = self.lock_store();
            if reply.kind == ReplyKind::Farewell {
                store.clear(user_id);
            }
            store.append(
                user_id,
                Role::User,
                message,
                MessageMeta {
                    intent: Some(intent),
                    sentiment: Some(sentiment),
                    entities: Some(entities.clone()),
                    ..Default::default()
                },
            );
            store.append(
                user_id,
                Role::Assistant,
                &reply.response,
                MessageMeta {
                    tier: Some(reply.tier),
                    kind: Some(reply.kind.as_str().to_string()),
                    ..Default::default()
                },
            );
        }

        debug!(
            intent = intent.as_str(),
            tier = reply.tier,
            severity_input = ?assessment.self_report,
            risk_detected = forced,
            chars = message.chars().count(),
            "request handled"
        );

        self.audit(RequestRecord {
            timestamp: Utc::now(),
            user_hash: hash_user(user_id),
            intent,
            tier: reply.tier,
            severity_input: assessment.self_report,
            risk_detected: forced,
            risk_category: assessment.risk.as_ref().map(|hit| hit.category),
            ai_enhanced: reply.ai_enhanced,
            emergency_mode,
            message_chars: message.chars().count(),
        });

        reply
    }

    /// No medical signal at all, or an off-topic word with nothing medical
    fn is_non_medical(&self, message: &str, intent: Intent, entities: &EntityBundle) -> bool {
        if entities.has_medical_signal() {
            return false;
        }
        !intent.is_medical() || self.lexicon.mentions_non_medical(&message.to_lowercase())
    }

    #[allow(clippy::too_many_arguments)]
    async fn augment(
        &self,
        reply: &mut TriageReply,
        message: &str,
        entities: &EntityBundle,
        sentiment: Sentiment,
        history: &[Message],
        emergency_mode: bool,
        cancel: &CancellationToken,
    ) {
        let strict = emergency_mode.then(|| self.emergency.strict_prompt());
        let context_line = ai_context_line(history.len(), entities, sentiment);
        let banner = self.config.safety_banner();
        let request = AugmentRequest {
            message,
            symptoms: &entities.symptoms,
            tier: reply.tier,
            override_prompt: strict.as_deref(),
            context_line: Some(&context_line),
            banner: &banner,
        };

        match self.augmenter.augment(request, cancel).await {
            Ok(text) => {
                reply.response = text;
                reply.ai_enhanced = true;
            }
            Err(e) => warn!(error = %e, "augmentation failed, keeping deterministic reply"),
        }
    }

    /// Record this turn's symptoms and return the pattern alert, if any
    fn track_symptoms(&self, user_id: &str, symptoms: &[String], tier: u8) -> Option<String> {
        let log = self.symptom_log.as_ref()?;
        let log = log.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let entry = SymptomEntry {
            user_id: user_id.to_string(),
            symptoms: symptoms.to_vec(),
            tier,
            timestamp: now,
        };
        if let Err(e) = log.record(&entry) {
            warn!(error = %e, "failed to record symptoms");
            return None;
        }

        let days = self.config.pattern_window_days;
        match log.pattern(user_id, days, now) {
            Ok(pattern) => pattern.alert(days),
            Err(e) => {
                warn!(error = %e, "symptom pattern lookup failed");
                None
            }
        }
    }

    fn audit(&self, record: RequestRecord) {
        if let Some(path) = &self.requests_file {
            if let Err(e) = append_jsonl(path, &record) {
                warn!(error = %e, "failed to append request record");
            }
        }
    }

    /// A turn that panicked mid-update leaves at worst one half-written
    /// exchange behind, which the store tolerates.
    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn user_slot(&self, user_id: &str) -> UserSlot<'_> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        UserSlot {
            engine: self,
            user_id: user_id.to_string(),
            lock,
        }
    }

    /// Users with a turn running or waiting
    pub fn users_in_flight(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn summary(&self, user_id: &str) -> Option<ConversationSummary> {
        self.lock_store().summary(user_id)
    }

    pub fn history(&self, user_id: &str, limit: usize) -> Vec<Message> {
        self.lock_store().recent(user_id, limit)
    }

    /// Creates the conversation record when absent
    pub fn context(&self, user_id: &str) -> ConversationContext {
        self.lock_store().get_context(user_id)
    }

    pub fn has_conversation(&self, user_id: &str) -> bool {
        self.lock_store().contains(user_id)
    }

    pub fn escalate(
        &self,
        user_id: &str,
        session_id: &str,
        kind: EscalationKind,
        location: Option<Location>,
    ) -> Result<EscalationEntry, EngineError> {
        Ok(self.emergency.escalate(user_id, session_id, kind, location)?)
    }

    pub fn deactivate(&self, session_id: &str) -> Result<bool, EngineError> {
        Ok(self.emergency.deactivate(session_id)?)
    }

    pub fn is_emergency_active(&self, session_id: &str) -> bool {
        self.emergency.is_active(session_id)
    }

    pub fn hospitals(&self, lat: f64, lon: f64) -> HospitalLookup {
        self.emergency.hospitals(lat, lon)
    }

    /// Pattern over the configured window; `no_data` without a symptom log
    pub fn pattern(&self, user_id: &str, days: u32) -> SymptomPattern {
        let Some(log) = self.symptom_log.as_ref() else {
            return SymptomPattern::no_data();
        };
        let log = log.lock().unwrap_or_else(|e| e.into_inner());
        log.pattern(user_id, days, Utc::now()).unwrap_or_else(|e| {
            warn!(error = %e, "symptom pattern lookup failed");
            SymptomPattern::no_data()
        })
    }

    /// Drop conversations, cached classifications and emergency sessions.
    /// Durable logs are left alone.
    pub fn reset(&self) {
        self.lock_store().reset();
        self.intents.clear_cache();
        self.emergency.reset();
        self.user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// A user's place in the per-user turn queue. Dropping it forgets the user
/// once nobody else holds or waits on the same lock, including when the
/// turn future is dropped early.
struct UserSlot<'a> {
    engine: &'a Engine,
    user_id: String,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for UserSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .engine
            .user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Swap our handle out while the map is locked so the count is exact
        drop(std::mem::replace(&mut self.lock, Arc::new(AsyncMutex::new(()))));
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}

fn ai_context_line(history_len: usize, entities: &EntityBundle, sentiment: Sentiment) -> String {
    let mut parts = Vec::new();
    if history_len > 0 {
        parts.push(format!("Previous messages: {}", history_len));
    }
    if !entities.symptoms.is_empty() {
        parts.push(format!("Mentioned symptoms: {}", entities.symptoms.join(", ")));
    }
    if let Some(duration) = &entities.duration {
        parts.push(format!("Duration: {}", duration));
    }
    if sentiment != Sentiment::Neutral {
        parts.push(format!("User sentiment: {}", sentiment.as_str()));
    }
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medtriage_augment::{AugmentError, GenerativeBackend};
    use medtriage_emergency::CLOSING_LINE;
    use medtriage_telemetry::{read_jsonl, EscalationStatus};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Canned(&'static str);

    #[async_trait]
    impl GenerativeBackend for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl GenerativeBackend for Broken {
        async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
            Err(AugmentError::Http { status: 502 })
        }
    }

    struct Stalls;

    #[async_trait]
    impl GenerativeBackend for Stalls {
        async fn generate(&self, _prompt: &str) -> Result<String, AugmentError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    struct Panics;

    impl SeverityClassifier for Panics {
        fn classify(&self, _text: &str, _entities: &EntityBundle) -> Tier {
            panic!("classifier blew up");
        }
    }

    fn engine(dir: &TempDir) -> Engine {
        Engine::with_lexicon(
            Config::new(),
            Lexicon::builtin(),
            EscalationLog::new(dir.path().join("emergency_log.jsonl")),
        )
    }

    fn augmented(dir: &TempDir, backend: Arc<dyn GenerativeBackend>) -> Engine {
        engine(dir).with_augmenter(Augmenter::new(backend, Duration::from_millis(200)))
    }

    #[tokio::test]
    async fn test_empty_message_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let reply = e.handle(&TriageRequest::new("u1", "   ")).await;
        assert_eq!(reply.kind, ReplyKind::Clarify);
        assert_eq!(reply.tier, 0);
        assert!(!e.has_conversation("u1"));
    }

    #[tokio::test]
    async fn test_both_messages_appended() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        e.handle(&TriageRequest::new("u1", "I have a headache")).await;

        let history = e.history("u1", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].metadata.intent, Some(Intent::SymptomQuery));
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].metadata.kind.as_deref(), Some("mild"));
        assert_eq!(e.context("u1").symptoms, vec!["headache"]);
    }

    #[tokio::test]
    async fn test_gate_beats_self_report() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let reply = e
            .handle(&TriageRequest::new("u1", "Severity: 2/10 but I have chest pain"))
            .await;
        assert_eq!(reply.tier, 4);
        assert_eq!(reply.kind, ReplyKind::Emergency);
        assert!(reply.emergency_mode);
        assert_eq!(reply.restrictions, Some(Restrictions::STRICT));
        assert!(reply.response.contains("🚨 CALL 112 IMMEDIATELY"));
    }

    #[tokio::test]
    async fn test_self_report_sets_tier() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let reply = e
            .handle(&TriageRequest::new("u1", "my stomach hurts. Severity: 8/10"))
            .await;
        assert_eq!(reply.tier, 3);
        assert_eq!(reply.kind, ReplyKind::Serious);
        assert!(!reply.emergency_mode);
    }

    #[tokio::test]
    async fn test_non_medical_gets_redirect() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let reply = e.handle(&TriageRequest::new("u1", "tell me a joke")).await;
        assert_eq!(reply.kind, ReplyKind::Redirect);
        assert_eq!(reply.tier, 0);
    }

    #[tokio::test]
    async fn test_gate_activates_session_and_next_turn_stays_guarded() {
        let dir = TempDir::new().unwrap();
        let e = augmented(&dir, Arc::new(Canned("Please stay calm and rest.")));

        let first = e
            .handle(&TriageRequest::new("u1", "I think it is a heart attack").with_session("s1"))
            .await;
        assert!(first.emergency_mode);
        assert!(e.is_emergency_active("s1"));
        assert!(first.ai_enhanced);
        assert!(first.response.starts_with("🚨 CALL 112 IMMEDIATELY"));
        assert!(first.response.ends_with(CLOSING_LINE));

        let second = e
            .handle(&TriageRequest::new("u1", "hello").with_session("s1"))
            .await;
        assert!(second.emergency_mode);
        assert!(second.response.contains("🚨 CALL 112 IMMEDIATELY"));

        assert!(e.deactivate("s1").unwrap());
        let third = e
            .handle(&TriageRequest::new("u1", "hello").with_session("s1"))
            .await;
        assert!(!third.emergency_mode);
        assert_eq!(third.kind, ReplyKind::Greeting);
    }

    #[tokio::test]
    async fn test_augmentation_failure_keeps_template() {
        let dir = TempDir::new().unwrap();
        let plain = engine(&dir)
            .handle(&TriageRequest::new("u1", "I have a cough and fever"))
            .await;

        let backends: Vec<Arc<dyn GenerativeBackend>> = vec![Arc::new(Broken), Arc::new(Stalls)];
        for backend in backends {
            let dir = TempDir::new().unwrap();
            let reply = augmented(&dir, backend)
                .handle(&TriageRequest::new("u1", "I have a cough and fever"))
                .await;
            assert!(!reply.ai_enhanced);
            assert_eq!(reply.response, plain.response);
        }
    }

    #[tokio::test]
    async fn test_cancelled_request_falls_back() {
        let dir = TempDir::new().unwrap();
        let e = augmented(&dir, Arc::new(Stalls));
        let token = CancellationToken::new();
        token.cancel();
        let reply = e
            .handle_with_cancel(&TriageRequest::new("u1", "I have a rash"), &token)
            .await;
        assert!(!reply.ai_enhanced);
        assert_eq!(reply.kind, ReplyKind::Mild);
    }

    #[tokio::test]
    async fn test_greeting_not_augmented() {
        let dir = TempDir::new().unwrap();
        let e = augmented(&dir, Arc::new(Canned("generated")));
        let reply = e.handle(&TriageRequest::new("u1", "hello")).await;
        assert!(!reply.ai_enhanced);
        assert_eq!(reply.kind, ReplyKind::Greeting);
    }

    #[tokio::test]
    async fn test_escalate_and_deactivate_passthrough() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        let entry = e
            .escalate("u1", "s1", EscalationKind::HospitalSearch, None)
            .unwrap();
        assert_eq!(entry.status, EscalationStatus::Active);
        assert!(!e.is_emergency_active("s1"));

        assert!(e.deactivate("s1").unwrap());
        assert!(!e.deactivate("s1").unwrap());
    }

    #[tokio::test]
    async fn test_pattern_alert_after_repeated_reports() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir).with_symptom_log(SymptomLog::in_memory().unwrap());

        let mut last = None;
        for _ in 0..4 {
            last = Some(e.handle(&TriageRequest::new("u1", "headache again")).await);
        }
        let reply = last.unwrap();
        assert!(reply.response.contains("📊 **Pattern Alert**"));
        assert!(e.pattern("u1", 7).is_recurring());
    }

    #[tokio::test]
    async fn test_unbounded_pattern_window() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            pattern_window_days: u32::MAX,
            ..Config::new()
        };
        let e = Engine::with_lexicon(
            config,
            Lexicon::builtin(),
            EscalationLog::new(dir.path().join("emergency_log.jsonl")),
        )
        .with_symptom_log(SymptomLog::in_memory().unwrap());

        let reply = e.handle(&TriageRequest::new("u1", "I have a headache")).await;
        assert_eq!(reply.kind, ReplyKind::Mild);
        assert_eq!(e.pattern("u1", u32::MAX).frequency, 1);
    }

    #[tokio::test]
    async fn test_request_audit_has_no_raw_text() {
        let dir = TempDir::new().unwrap();
        let audit = dir.path().join("requests.jsonl");
        let e = engine(&dir).with_request_audit(audit.clone());
        e.handle(&TriageRequest::new("patient-7", "I feel dizziness")).await;

        let records: Vec<RequestRecord> = read_jsonl(&audit).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_hash, hash_user("patient-7"));
        assert_eq!(records[0].intent, Intent::Unknown);
        let raw = std::fs::read_to_string(&audit).unwrap();
        assert!(!raw.contains("dizziness"));
        assert!(!raw.contains("patient-7"));
    }

    #[tokio::test]
    async fn test_reset_drops_state() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir);
        e.handle(&TriageRequest::new("u1", "chest pain").with_session("s1"))
            .await;
        assert!(e.is_emergency_active("s1"));

        e.reset();
        assert!(!e.has_conversation("u1"));
        assert!(!e.is_emergency_active("s1"));
    }

    #[tokio::test]
    async fn test_poisoned_store_keeps_serving() {
        let dir = TempDir::new().unwrap();
        let e = Arc::new(engine(&dir));

        let poisoner = e.clone();
        let joined = std::thread::spawn(move || {
            let _store = poisoner.store.lock().unwrap();
            panic!("poison the conversation store");
        })
        .join();
        assert!(joined.is_err());
        assert!(e.store.is_poisoned());

        let reply = e.handle(&TriageRequest::new("u1", "I have a headache")).await;
        assert_eq!(reply.kind, ReplyKind::Mild);
        assert_eq!(e.history("u1", 10).len(), 2);
        assert_eq!(e.context("u1").symptoms, vec!["headache"]);
    }

    #[tokio::test]
    async fn test_panicking_turn_gets_failure_reply() {
        let dir = TempDir::new().unwrap();
        let e = engine(&dir).with_classifier(Box::new(Panics));

        let reply = e.handle(&TriageRequest::new("u1", "I have a headache")).await;
        assert_eq!(reply.kind, ReplyKind::Error);
        assert_eq!(reply.tier, 0);
        assert!(!reply.emergency_mode);

        // The gate never reaches the classifier
        let reply = e
            .handle(&TriageRequest::new("u1", "chest pain").with_session("s1"))
            .await;
        assert_eq!(reply.kind, ReplyKind::Emergency);

        let reply = e
            .handle(&TriageRequest::new("u1", "I have a headache").with_session("s1"))
            .await;
        assert_eq!(reply.kind, ReplyKind::Error);
        assert!(reply.emergency_mode);
        assert!(reply.response.contains("Emergency services must be contacted directly"));
        assert_eq!(e.users_in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_user_locks_are_released() {
        let dir = TempDir::new().unwrap();
        let e = Arc::new(engine(&dir));

        let mut handles = Vec::new();
        for i in 0..32 {
            let e = e.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user-{}", i % 5);
                e.handle(&TriageRequest::new(user, "I have a cough")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(e.users_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_turn_releases_user_lock() {
        let dir = TempDir::new().unwrap();
        let e = augmented(&dir, Arc::new(Stalls));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            e.handle(&TriageRequest::new("u1", "I have a cough")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(e.users_in_flight(), 0);

        let reply = e.handle(&TriageRequest::new("u1", "hello")).await;
        assert_eq!(reply.kind, ReplyKind::Greeting);
        assert_eq!(e.users_in_flight(), 0);
    }

    #[test]
    fn test_ai_context_line() {
        let entities = EntityBundle {
            symptoms: vec!["fever".to_string()],
            duration: Some("2 days".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ai_context_line(3, &entities, Sentiment::Anxious),
            "Previous messages: 3 | Mentioned symptoms: fever | Duration: 2 days | User sentiment: anxious"
        );
        assert_eq!(
            ai_context_line(0, &EntityBundle::default(), Sentiment::Neutral),
            ""
        );
    }
}
