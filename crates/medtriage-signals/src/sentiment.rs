//! Sentiment by counting lexicon word hits. Any anxiety word wins;
//! otherwise the larger of the negative and positive counts decides, and a
//! tie is neutral.

use medtriage_core::{Lexicon, Sentiment};
use std::sync::Arc;

pub struct SentimentAnalyzer {
    lexicon: Arc<Lexicon>,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Any anxiety word wins outright; otherwise the larger of the negative
    /// and positive counts, neutral on a tie.
    pub fn analyze(&self, text: &str) -> Sentiment {
        let lower = text.to_lowercase();
        let count = |words: &[String]| {
            words
                .iter()
                .filter(|w| lower.contains(w.as_str()))
                .count()
        };

        let words = &self.lexicon.sentiment;
        if count(&words.anxiety) > 0 {
            return Sentiment::Anxious;
        }

        let negative = count(&words.negative);
        let positive = count(&words.positive);
        match negative.cmp(&positive) {
            std::cmp::Ordering::Greater => Sentiment::Negative,
            std::cmp::Ordering::Less => Sentiment::Positive,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}
