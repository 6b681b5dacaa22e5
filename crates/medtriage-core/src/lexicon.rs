//! Keyword lexicons: intents, symptoms, severity words, body parts, sentiment
//! buckets and the high-risk phrase list.
//!
//! The built-in tables are the default. A lexicon can also be loaded from a
//! versioned JSON resource with the same shape, which is how fixtures swap
//! vocabularies in tests.

use crate::error::CoreError;
use crate::types::{Intent, SeverityWord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest lexicon schema version this build understands
pub const LEXICON_VERSION: u32 = 1;

struct IntentTable {
    intent: Intent,
    keywords: &'static [&'static str],
}

const INTENT_TABLE: &[IntentTable] = &[
    IntentTable {
        intent: Intent::Greeting,
        keywords: &["hello", "hi", "hey", "good morning", "good evening"],
    },
    IntentTable {
        intent: Intent::SymptomQuery,
        keywords: &["pain", "hurt", "ache", "sick", "ill", "fever", "cough"],
    },
    IntentTable {
        intent: Intent::Emergency,
        keywords: &["emergency", "urgent", "severe", "critical", "dying"],
    },
    IntentTable {
        intent: Intent::Medication,
        keywords: &["medicine", "pill", "drug", "prescription", "tablet"],
    },
    IntentTable {
        intent: Intent::Appointment,
        keywords: &["appointment", "schedule", "book", "doctor visit"],
    },
    IntentTable {
        intent: Intent::FollowUp,
        keywords: &["yes", "no", "okay", "continue", "tell me more"],
    },
    IntentTable {
        intent: Intent::Gratitude,
        keywords: &["thank", "thanks", "appreciate"],
    },
    IntentTable {
        intent: Intent::Farewell,
        keywords: &["bye", "goodbye", "see you", "later"],
    },
];

static SYMPTOMS: &[&str] = &[
    "fever",
    "cough",
    "headache",
    "pain",
    "nausea",
    "vomiting",
    "diarrhea",
    "fatigue",
    "dizziness",
    "rash",
    "swelling",
];

static BODY_PARTS: &[&str] = &[
    "head", "chest", "stomach", "abdomen", "back", "leg", "arm", "throat", "neck", "shoulder",
    "knee", "ankle", "foot", "hand",
];

static DURATION_UNITS: &[&str] = &[
    "day", "days", "week", "weeks", "month", "months", "hour", "hours",
];

static SEVERITY_GROUPS: &[(SeverityWord, &[&str])] = &[
    (SeverityWord::Mild, &["mild", "slight", "little"]),
    (SeverityWord::Moderate, &["moderate", "medium", "average"]),
    (
        SeverityWord::Severe,
        &["severe", "intense", "extreme", "unbearable", "terrible"],
    ),
];

static POSITIVE_WORDS: &[&str] = &["good", "better", "improving", "happy", "fine", "great"];
static NEGATIVE_WORDS: &[&str] = &["bad", "worse", "terrible", "awful", "horrible", "pain"];
static ANXIETY_WORDS: &[&str] = &["worried", "scared", "anxious", "concerned", "afraid", "panic"];

static CRITICAL_WORDS: &[&str] = &["critical", "dying"];

static NON_MEDICAL_WORDS: &[&str] = &[
    "joke",
    "weather",
    "date",
    "time",
    "sport",
    "movie",
    "music",
    "politics",
    "celebrity",
    "recipe",
    "game",
];

static HIGH_RISK: &[(RiskCategory, &[&str])] = &[
    (
        RiskCategory::Cardiac,
        &[
            "chest pain",
            "chest tightness",
            "pressure in chest",
            "crushing chest",
            "burning chest",
            "pain in left arm",
            "pain in jaw",
            "pain in neck",
            "heart pain",
            "heart attack",
            "cardiac arrest",
            "palpitations with dizziness",
            "irregular heartbeat with pain",
            "sudden chest discomfort",
            "shortness of breath with chest pain",
        ],
    ),
    (
        RiskCategory::StrokeNeuro,
        &[
            "sudden weakness",
            "weakness on one side",
            "face drooping",
            "slurred speech",
            "trouble speaking",
            "trouble understanding",
            "sudden confusion",
            "sudden vision loss",
            "blurred vision suddenly",
            "loss of balance",
            "sudden dizziness",
            "severe headache sudden",
            "worst headache",
            "numbness on one side",
            "loss of coordination",
        ],
    ),
    (
        RiskCategory::Respiratory,
        &[
            "difficulty breathing",
            "cannot breathe",
            "can't breathe",
            "shortness of breath",
            "breathlessness",
            "gasping",
            "wheezing severe",
            "choking",
            "airway blocked",
            "tight throat",
            "bluish lips",
            "bluish face",
            "rapid breathing",
            "chest retractions",
        ],
    ),
    (
        RiskCategory::Trauma,
        &[
            "unbearable pain",
            "extreme pain",
            "severe pain sudden",
            "intense abdominal pain",
            "sharp abdominal pain",
            "severe back pain sudden",
            "head injury",
            "loss of consciousness",
            "fainted",
            "collapsed",
            "severe injury",
            "major accident",
            "fracture",
            "bone sticking out",
        ],
    ),
    (
        RiskCategory::Bleeding,
        &[
            "heavy bleeding",
            "bleeding won't stop",
            "vomiting blood",
            "coughing blood",
            "blood in stool black",
            "blood in urine",
            "internal bleeding",
            "pale skin",
            "cold clammy",
            "shock symptoms",
        ],
    ),
    (
        RiskCategory::Allergy,
        &[
            "swelling of face",
            "swelling of lips",
            "swelling of tongue",
            "throat swelling",
            "difficulty swallowing",
            "severe allergic",
            "anaphylaxis",
            "hives with breathing",
        ],
    ),
    (
        RiskCategory::FeverInfection,
        &[
            "very high fever",
            "fever above 104",
            "fever with rash",
            "fever with confusion",
            "stiff neck",
            "fever and seizure",
            "febrile seizure",
        ],
    ),
    (
        RiskCategory::Poisoning,
        &[
            "poisoning",
            "overdose",
            "took too much",
            "swallowed poison",
            "chemical ingestion",
            "alcohol poisoning",
            "substance ingestion",
        ],
    ),
    (
        RiskCategory::MentalHealth,
        &[
            "suicidal",
            "want to die",
            "harm myself",
            "kill myself",
            "self harm",
            "cutting myself",
            "overdose intentionally",
            "hearing voices",
        ],
    ),
    (
        RiskCategory::PregnancyChild,
        &[
            "pregnant bleeding",
            "abdominal pain pregnancy",
            "baby not moving",
            "child unconscious",
            "child not breathing",
            "newborn fever",
            "seizure in child",
        ],
    ),
];

/// The ten high-risk phrase categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Cardiac,
    StrokeNeuro,
    Respiratory,
    Trauma,
    Bleeding,
    Allergy,
    FeverInfection,
    Poisoning,
    MentalHealth,
    PregnancyChild,
}

impl RiskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Cardiac => "cardiac",
            RiskCategory::StrokeNeuro => "stroke_neuro",
            RiskCategory::Respiratory => "respiratory",
            RiskCategory::Trauma => "trauma",
            RiskCategory::Bleeding => "bleeding",
            RiskCategory::Allergy => "allergy",
            RiskCategory::FeverInfection => "fever_infection",
            RiskCategory::Poisoning => "poisoning",
            RiskCategory::MentalHealth => "mental_health",
            RiskCategory::PregnancyChild => "pregnancy_child",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentKeywords {
    pub intent: Intent,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityGroup {
    pub level: SeverityWord,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskGroup {
    pub category: RiskCategory,
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub anxiety: Vec<String>,
}

/// All keyword vocabularies used by the extractors and the emergency gate.
/// Every list is matched by literal substring against lower-cased text, and
/// list order is significant wherever the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub version: u32,
    pub intents: Vec<IntentKeywords>,
    pub symptoms: Vec<String>,
    pub severity_words: Vec<SeverityGroup>,
    pub body_parts: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    pub duration_units: Vec<String>,
    pub sentiment: SentimentLexicon,
    #[serde(default)]
    pub critical_words: Vec<String>,
    #[serde(default)]
    pub non_medical: Vec<String>,
    pub high_risk: Vec<RiskGroup>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self {
            version: LEXICON_VERSION,
            intents: INTENT_TABLE
                .iter()
                .map(|entry| IntentKeywords {
                    intent: entry.intent,
                    keywords: owned(entry.keywords),
                })
                .collect(),
            symptoms: owned(SYMPTOMS),
            severity_words: SEVERITY_GROUPS
                .iter()
                .map(|(level, words)| SeverityGroup {
                    level: *level,
                    words: owned(words),
                })
                .collect(),
            body_parts: owned(BODY_PARTS),
            medications: Vec::new(),
            duration_units: owned(DURATION_UNITS),
            sentiment: SentimentLexicon {
                positive: owned(POSITIVE_WORDS),
                negative: owned(NEGATIVE_WORDS),
                anxiety: owned(ANXIETY_WORDS),
            },
            critical_words: owned(CRITICAL_WORDS),
            non_medical: owned(NON_MEDICAL_WORDS),
            high_risk: HIGH_RISK
                .iter()
                .map(|(category, phrases)| RiskGroup {
                    category: *category,
                    phrases: owned(phrases),
                })
                .collect(),
        }
    }

    /// Parse and validate a lexicon resource. Keywords are lower-cased on load
    /// so matching against lower-cased input stays literal.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut lexicon: Lexicon = serde_json::from_str(json)?;
        lexicon.normalize();
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.version == 0 || self.version > LEXICON_VERSION {
            return Err(CoreError::UnsupportedLexiconVersion {
                found: self.version,
                supported: LEXICON_VERSION,
            });
        }
        if self.intents.is_empty() {
            return Err(CoreError::InvalidLexicon("no intents defined".to_string()));
        }
        for entry in &self.intents {
            if entry.intent == Intent::Unknown {
                return Err(CoreError::InvalidLexicon(
                    "`unknown` is reserved for unmatched input".to_string(),
                ));
            }
            if entry.keywords.iter().all(|k| k.is_empty()) {
                return Err(CoreError::InvalidLexicon(format!(
                    "intent `{}` has no keywords",
                    entry.intent.as_str()
                )));
            }
        }
        if self.high_risk.iter().all(|g| g.phrases.is_empty()) {
            return Err(CoreError::InvalidLexicon(
                "high-risk phrase list is empty".to_string(),
            ));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let lower = |words: &mut Vec<String>| {
            for w in words.iter_mut() {
                *w = w.to_lowercase();
            }
            words.retain(|w| !w.is_empty());
        };
        for entry in &mut self.intents {
            lower(&mut entry.keywords);
        }
        lower(&mut self.symptoms);
        for group in &mut self.severity_words {
            lower(&mut group.words);
        }
        lower(&mut self.body_parts);
        lower(&mut self.medications);
        lower(&mut self.duration_units);
        lower(&mut self.sentiment.positive);
        lower(&mut self.sentiment.negative);
        lower(&mut self.sentiment.anxiety);
        lower(&mut self.critical_words);
        lower(&mut self.non_medical);
        for group in &mut self.high_risk {
            lower(&mut group.phrases);
        }
    }

    /// First high-risk phrase contained in already lower-cased text
    pub fn find_high_risk(&self, text_lower: &str) -> Option<(RiskCategory, &str)> {
        self.high_risk.iter().find_map(|group| {
            group
                .phrases
                .iter()
                .find(|phrase| text_lower.contains(phrase.as_str()))
                .map(|phrase| (group.category, phrase.as_str()))
        })
    }

    /// Whole words only: "update" does not mention "date"
    pub fn mentions_non_medical(&self, text_lower: &str) -> bool {
        self.non_medical
            .iter()
            .any(|word| contains_word(text_lower, word))
    }
}

/// `phrase` occurs in `text` with no letter or digit directly on either side
fn contains_word(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}
