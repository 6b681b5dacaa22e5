//! Entity extraction: symptoms, duration, severity word, body parts

use medtriage_core::{EntityBundle, Lexicon, SeverityWord};
use std::sync::Arc;

pub struct EntityExtractor {
    lexicon: Arc<Lexicon>,
}

impl EntityExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Never fails; a message with nothing recognizable gives an empty bundle
    pub fn extract(&self, text: &str) -> EntityBundle {
        let lower = text.to_lowercase();

        EntityBundle {
            symptoms: contained(&self.lexicon.symptoms, &lower),
            duration: self.duration(&lower),
            severity: self.severity(&lower),
            body_parts: contained(&self.lexicon.body_parts, &lower),
            medications: contained(&self.lexicon.medications, &lower),
        }
    }

    /// `<integer> <unit>` adjacency only. "a week" and "few days" are not
    /// recognized.
    fn duration(&self, lower: &str) -> Option<String> {
        let tokens: Vec<&str> = lower.split_whitespace().collect();

        for (i, token) in tokens.iter().enumerate().skip(1) {
            let unit = self
                .lexicon
                .duration_units
                .iter()
                .filter(|u| token.contains(u.as_str()))
                .max_by_key(|u| u.len());
            let Some(unit) = unit else {
                continue;
            };
            if let Ok(n) = tokens[i - 1].parse::<i64>() {
                return Some(format!("{} {}", n, unit));
            }
        }
        None
    }

    fn severity(&self, lower: &str) -> Option<SeverityWord> {
        [SeverityWord::Mild, SeverityWord::Moderate, SeverityWord::Severe]
            .into_iter()
            .find(|level| {
                self.lexicon
                    .severity_words
                    .iter()
                    .filter(|group| group.level == *level)
                    .flat_map(|group| group.words.iter())
                    .any(|w| lower.contains(w.as_str()))
            })
    }
}

/// Vocabulary entries contained in `lower`, in vocabulary order, deduplicated
fn contained(vocabulary: &[String], lower: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for word in vocabulary {
        if lower.contains(word.as_str()) && !found.contains(word) {
            found.push(word.clone());
        }
    }
    found
}
