use crate::symptom_log::SymptomEntry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Nothing ever logged for the user
    NoData,
    /// History exists but none inside the window
    NoRecentData,
    Isolated,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTrend {
    Increasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomPattern {
    pub pattern: PatternKind,
    pub most_common_symptoms: Vec<(String, usize)>,
    pub severity_trend: Option<SeverityTrend>,
    pub frequency: usize,
    pub recommendation: Option<String>,
}

/// More than this many reports in the window counts as recurring
const RECURRING_THRESHOLD: usize = 3;
const EVALUATION_THRESHOLD: usize = 5;

impl SymptomPattern {
    pub fn no_data() -> Self {
        Self::empty(PatternKind::NoData)
    }

    fn empty(pattern: PatternKind) -> Self {
        Self {
            pattern,
            most_common_symptoms: Vec::new(),
            severity_trend: None,
            frequency: 0,
            recommendation: None,
        }
    }

    /// `entries` must be oldest first
    pub fn from_entries(entries: &[SymptomEntry]) -> Self {
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return Self::empty(PatternKind::NoRecentData);
        };

        // first-seen order breaks frequency ties
        let mut counts: Vec<(String, usize)> = Vec::new();
        for symptom in entries.iter().flat_map(|e| e.symptoms.iter()) {
            match counts.iter_mut().find(|(name, _)| name == symptom) {
                Some((_, n)) => *n += 1,
                None => counts.push((symptom.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(3);

        let trend = if last.tier > first.tier {
            SeverityTrend::Increasing
        } else {
            SeverityTrend::Stable
        };

        let recommendation = if entries.len() > EVALUATION_THRESHOLD {
            "Recurring symptoms detected. Recommend comprehensive medical evaluation."
        } else if entries.iter().any(|e| e.tier > 2) {
            "High severity symptoms present. Consult healthcare provider soon."
        } else {
            "Monitor symptoms and maintain healthy lifestyle."
        };

        Self {
            pattern: if entries.len() > RECURRING_THRESHOLD {
                PatternKind::Recurring
            } else {
                PatternKind::Isolated
            },
            most_common_symptoms: counts,
            severity_trend: Some(trend),
            frequency: entries.len(),
            recommendation: Some(recommendation.to_string()),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.pattern == PatternKind::Recurring
    }

    /// Paragraph appended to medical replies when the pattern is recurring
    pub fn alert(&self, days: u32) -> Option<String> {
        if !self.is_recurring() {
            return None;
        }
        let span = if days == 7 {
            "the past week".to_string()
        } else {
            format!("the past {} days", days)
        };
        Some(format!(
            "📊 **Pattern Alert**: I've noticed recurring symptoms over {}. {}",
            span,
            self.recommendation.as_deref().unwrap_or_default()
        ))
    }
}
