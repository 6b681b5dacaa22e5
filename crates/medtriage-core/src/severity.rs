//! Severity mapping: the emergency gate, the explicit self-report token and
//! the rule-based fallback classifier.
//!
//! Ordering is fixed. The gate runs first and, when it fires, the result is
//! final at [`Tier::Emergency`]; neither the self-report nor the classifier
//! is consulted. Otherwise an explicit `Severity: N/10` token wins over the
//! classifier.

use crate::lexicon::{Lexicon, RiskCategory};
use crate::types::{EntityBundle, SeverityWord, Tier};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static SELF_REPORT_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Extract an explicit `Severity: N/10` value. Digits that overflow are
/// treated as the largest value, which clamps to 10 downstream.
pub fn parse_self_report(text: &str) -> Option<u64> {
    let re = SELF_REPORT_RE
        .get_or_init(|| Regex::new(r"(?i)severity:\s*(\d+)\s*/\s*10").ok())
        .as_ref()?;
    let caps = re.captures(text)?;
    let digits = caps.get(1)?.as_str();
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// High-risk phrase that triggered the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskHit {
    pub category: RiskCategory,
    pub phrase: String,
}

/// Substring scan of the raw input against the high-risk phrase list
pub struct EmergencyGate<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> EmergencyGate<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn check(&self, text: &str) -> Option<RiskHit> {
        let lower = text.to_lowercase();
        self.lexicon
            .find_high_risk(&lower)
            .map(|(category, phrase)| RiskHit {
                category,
                phrase: phrase.to_string(),
            })
    }
}

/// Fallback tiering used when no explicit self-report is present
pub trait SeverityClassifier: Send + Sync {
    fn classify(&self, text: &str, entities: &EntityBundle) -> Tier;
}

/// Keyword and symptom-count rules.
///
/// Precedence: critical words, then the severity adjective, then the number
/// of distinct symptoms.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    critical_words: Vec<String>,
}

impl RuleClassifier {
    pub fn new(critical_words: Vec<String>) -> Self {
        Self { critical_words }
    }

    pub fn from_lexicon(lexicon: &Lexicon) -> Self {
        Self::new(lexicon.critical_words.clone())
    }
}

impl SeverityClassifier for RuleClassifier {
    fn classify(&self, text: &str, entities: &EntityBundle) -> Tier {
        let lower = text.to_lowercase();
        if self
            .critical_words
            .iter()
            .any(|w| lower.contains(w.as_str()))
        {
            return Tier::Emergency;
        }

        match entities.severity {
            Some(SeverityWord::Severe) => Tier::Serious,
            Some(SeverityWord::Moderate) => Tier::Moderate,
            Some(SeverityWord::Mild) => Tier::Mild,
            None => match entities.symptoms.len() {
                0..=1 => Tier::Mild,
                2..=3 => Tier::Moderate,
                _ => Tier::Serious,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSource {
    Gate,
    SelfReport,
    Classifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityAssessment {
    pub tier: Tier,
    pub source: TierSource,
    /// Raw self-report value before clamping
    pub self_report: Option<u64>,
    pub risk: Option<RiskHit>,
}

impl SeverityAssessment {
    /// True when the gate fired; the generator must render the emergency template
    pub fn is_override(&self) -> bool {
        self.source == TierSource::Gate
    }
}

pub struct SeverityMapper {
    lexicon: Arc<Lexicon>,
    classifier: Box<dyn SeverityClassifier>,
}

impl SeverityMapper {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        let classifier = RuleClassifier::from_lexicon(&lexicon);
        Self::with_classifier(lexicon, Box::new(classifier))
    }

    pub fn with_classifier(lexicon: Arc<Lexicon>, classifier: Box<dyn SeverityClassifier>) -> Self {
        Self {
            lexicon,
            classifier,
        }
    }

    pub fn gate(&self, text: &str) -> Option<RiskHit> {
        EmergencyGate::new(&self.lexicon).check(text)
    }

    /// Finish tiering once the gate result is known. `entities` is only read
    /// by the classifier fallback.
    pub fn resolve(
        &self,
        risk: Option<RiskHit>,
        text: &str,
        entities: &EntityBundle,
    ) -> SeverityAssessment {
        let self_report = parse_self_report(text);

        if let Some(hit) = risk {
            debug!(category = hit.category.as_str(), "emergency gate fired");
            return SeverityAssessment {
                tier: Tier::Emergency,
                source: TierSource::Gate,
                self_report,
                risk: Some(hit),
            };
        }

        if let Some(value) = self_report {
            return SeverityAssessment {
                tier: Tier::from_self_report(value),
                source: TierSource::SelfReport,
                self_report,
                risk: None,
            };
        }

        SeverityAssessment {
            tier: self.classifier.classify(text, entities),
            source: TierSource::Classifier,
            self_report: None,
            risk: None,
        }
    }

    pub fn assess(&self, text: &str, entities: &EntityBundle) -> SeverityAssessment {
        let risk = self.gate(text);
        self.resolve(risk, text, entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Tier);

    impl SeverityClassifier for Fixed {
        fn classify(&self, _text: &str, _entities: &EntityBundle) -> Tier {
            self.0
        }
    }

    struct MustNotRun;

    impl SeverityClassifier for MustNotRun {
        fn classify(&self, _text: &str, _entities: &EntityBundle) -> Tier {
            panic!("classifier consulted");
        }
    }

    fn symptoms(names: &[&str]) -> EntityBundle {
        EntityBundle {
            symptoms: names.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn mapper(classifier: Box<dyn SeverityClassifier>) -> SeverityMapper {
        SeverityMapper::with_classifier(Arc::new(Lexicon::builtin()), classifier)
    }

    #[test]
    fn test_parse_self_report() {
        assert_eq!(parse_self_report("Severity: 5/10"), Some(5));
        assert_eq!(parse_self_report("pain, severity:8/10 today"), Some(8));
        assert_eq!(parse_self_report("Severity: 5"), None);
        assert_eq!(parse_self_report("no token here"), None);
        assert_eq!(
            parse_self_report("Severity: 99999999999999999999999/10"),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_self_report_mapping_and_clamp() {
        let m = mapper(Box::new(MustNotRun));
        let cases = [
            (0, Tier::Mild),
            (3, Tier::Mild),
            (4, Tier::Moderate),
            (6, Tier::Moderate),
            (7, Tier::Serious),
            (10, Tier::Serious),
            (42, Tier::Serious),
        ];
        for (n, expected) in cases {
            let text = format!("headache Severity: {}/10", n);
            let a = m.assess(&text, &EntityBundle::default());
            assert_eq!(a.tier, expected, "self-report {}", n);
            assert_eq!(a.source, TierSource::SelfReport);
        }
    }

    #[test]
    fn test_gate_beats_self_report() {
        let m = mapper(Box::new(MustNotRun));
        let a = m.assess("Severity: 2/10 but I have chest pain", &EntityBundle::default());
        assert_eq!(a.tier, Tier::Emergency);
        assert!(a.is_override());
        assert_eq!(a.self_report, Some(2));
        assert_eq!(a.risk.unwrap().category, RiskCategory::Cardiac);
    }

    #[test]
    fn test_gate_is_case_insensitive() {
        let lexicon = Lexicon::builtin();
        let hit = EmergencyGate::new(&lexicon)
            .check("Sudden Chest Discomfort, CAN'T BREATHE")
            .unwrap();
        assert_eq!(hit.category, RiskCategory::Cardiac);
        assert_eq!(hit.phrase, "sudden chest discomfort");
    }

    #[test]
    fn test_classifier_fallback() {
        let m = mapper(Box::new(Fixed(Tier::Moderate)));
        let a = m.assess("my knee is stiff", &EntityBundle::default());
        assert_eq!(a.tier, Tier::Moderate);
        assert_eq!(a.source, TierSource::Classifier);
        assert!(!a.is_override());
    }

    #[test]
    fn test_rule_classifier_symptom_count() {
        let c = RuleClassifier::from_lexicon(&Lexicon::builtin());
        assert_eq!(c.classify("", &symptoms(&["fever"])), Tier::Mild);
        assert_eq!(c.classify("", &symptoms(&["fever", "cough"])), Tier::Moderate);
        assert_eq!(
            c.classify("", &symptoms(&["fever", "cough", "rash", "nausea"])),
            Tier::Serious
        );
    }

    #[test]
    fn test_rule_classifier_words() {
        let c = RuleClassifier::from_lexicon(&Lexicon::builtin());
        let mut e = symptoms(&["fever", "cough", "rash", "nausea"]);
        e.severity = Some(SeverityWord::Mild);
        assert_eq!(c.classify("", &e), Tier::Mild);

        e.severity = Some(SeverityWord::Severe);
        assert_eq!(c.classify("", &e), Tier::Serious);

        assert_eq!(c.classify("I feel like I'm dying", &e), Tier::Emergency);
    }
}
