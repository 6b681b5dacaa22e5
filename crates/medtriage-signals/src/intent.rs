//! Intent classification by keyword overlap

use medtriage_core::{Intent, Lexicon};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntentMatch {
    pub intent: Intent,
    /// Fraction of the winning intent's keywords present in the text
    pub confidence: f64,
}

impl IntentMatch {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
        }
    }
}

/// Scores every intent as `matches / keywords` and keeps the best. Ties go
/// to the intent defined first in the lexicon. Results are memoized by a
/// digest of the lower-cased text.
pub struct IntentClassifier {
    lexicon: Arc<Lexicon>,
    cache: Mutex<HashMap<String, IntentMatch>>,
}

impl IntentClassifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            lexicon,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn classify(&self, text: &str) -> IntentMatch {
        let lower = text.to_lowercase();
        let key = hex::encode(Sha256::digest(lower.as_bytes()));

        if let Some(hit) = self.cache().get(&key) {
            return *hit;
        }

        let result = self.score(&lower);
        debug!(
            intent = result.intent.as_str(),
            confidence = result.confidence,
            "classified intent"
        );
        self.cache().insert(key, result);
        result
    }

    fn score(&self, lower: &str) -> IntentMatch {
        let mut best: Option<IntentMatch> = None;

        for entry in &self.lexicon.intents {
            if entry.keywords.is_empty() {
                continue;
            }
            let hits = entry
                .keywords
                .iter()
                .filter(|kw| lower.contains(kw.as_str()))
                .count();
            if hits == 0 {
                continue;
            }
            let confidence = hits as f64 / entry.keywords.len() as f64;
            if best.map_or(true, |b| confidence > b.confidence) {
                best = Some(IntentMatch {
                    intent: entry.intent,
                    confidence,
                });
            }
        }

        best.unwrap_or_else(IntentMatch::unknown)
    }

    pub fn cached_len(&self) -> usize {
        self.cache().len()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    // A poisoned cache only ever holds complete entries, so keep using it.
    fn cache(&self) -> MutexGuard<'_, HashMap<String, IntentMatch>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medtriage_core::IntentKeywords;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(Arc::new(Lexicon::builtin()))
    }

    #[test]
    fn test_symptom_query() {
        let m = classifier().classify("I have had fever and cough for 3 days");
        assert_eq!(m.intent, Intent::SymptomQuery);
        assert!((m.confidence - 2.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_is_unknown() {
        let m = classifier().classify("purple elephants");
        assert_eq!(m, IntentMatch::unknown());
    }

    #[test]
    fn test_case_insensitive_and_cached() {
        let c = classifier();
        let a = c.classify("THANK YOU");
        let b = c.classify("thank you");
        assert_eq!(a, b);
        assert_eq!(a.intent, Intent::Gratitude);
        assert_eq!(c.cached_len(), 1);

        c.clear_cache();
        assert_eq!(c.cached_len(), 0);
    }

    #[test]
    fn test_tie_goes_to_first_defined() {
        let mut lexicon = Lexicon::builtin();
        lexicon.intents = vec![
            IntentKeywords {
                intent: Intent::Appointment,
                keywords: vec!["slot".to_string()],
            },
            IntentKeywords {
                intent: Intent::Medication,
                keywords: vec!["slot".to_string()],
            },
        ];
        let c = IntentClassifier::new(Arc::new(lexicon));
        assert_eq!(c.classify("any slot free?").intent, Intent::Appointment);
    }

    #[test]
    fn test_higher_ratio_wins() {
        // gratitude 2/3 beats greeting 1/5
        let m = classifier().classify("hey, thanks");
        assert_eq!(m.intent, Intent::Gratitude);
    }
}
