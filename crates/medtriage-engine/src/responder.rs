//! Deterministic response generation.
//!
//! Dispatch is on intent first and tier second. A gate override skips intent
//! dispatch entirely and always renders the emergency template. Nothing here
//! touches shared state; the engine applies side effects such as clearing
//! context after a farewell.

use crate::reply::{ReplyKind, TriageReply};
use medtriage_core::{
    ConversationContext, EntityBundle, Intent, Message, Role, Sentiment, SeverityWord, Tier,
};
use medtriage_emergency::CLOSING_LINE;

const RECURRING_NOTE: &str = "\n\n⚠️ **Note**: I notice you've mentioned similar symptoms before. This may require professional medical evaluation to identify the underlying cause.";

const FOLLOW_UP_ROUTINE: &[&str] = &[
    "How long have you had these symptoms?",
    "Have you tried any remedies?",
    "Are the symptoms getting better or worse?",
];

const FOLLOW_UP_URGENT: &[&str] = &[
    "Can you get to a doctor today?",
    "Is someone with you?",
    "Do you have transportation to emergency care?",
];

/// Everything the generator reads for one message
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub intent: Intent,
    pub entities: &'a EntityBundle,
    pub sentiment: Sentiment,
    /// Stored messages before this one, oldest first
    pub history: &'a [Message],
    pub context: &'a ConversationContext,
    /// 0 when the message carries no medical signal
    pub tier: u8,
    /// Emergency gate fired
    pub forced_emergency: bool,
}

pub struct Responder {
    emergency_number: String,
    recurrence_window: usize,
}

impl Responder {
    pub fn new(emergency_number: &str, recurrence_window: usize) -> Self {
        Self {
            emergency_number: emergency_number.to_string(),
            recurrence_window,
        }
    }

    pub fn banner(&self) -> String {
        format!("🚨 CALL {} IMMEDIATELY", self.emergency_number)
    }

    pub fn respond(&self, turn: &Turn<'_>) -> TriageReply {
        if turn.forced_emergency {
            return self.medical(turn, Tier::Emergency);
        }

        match turn.intent {
            Intent::Greeting => greeting(!turn.history.is_empty()),
            Intent::Gratitude => gratitude(),
            Intent::Farewell => farewell(),
            Intent::FollowUp => follow_up(turn.context),
            intent if intent == Intent::SymptomQuery || turn.tier > 0 => {
                let tier = Tier::from_level(turn.tier).unwrap_or(Tier::Mild);
                self.medical(turn, tier)
            }
            _ => redirect(),
        }
    }

    /// Any current symptom named in the last few stored user messages
    pub fn is_recurring(&self, symptoms: &[String], history: &[Message]) -> bool {
        if symptoms.is_empty() {
            return false;
        }
        let start = history.len().saturating_sub(self.recurrence_window);
        history[start..]
            .iter()
            .filter(|m| m.role == Role::User)
            .any(|m| {
                let content = m.content.to_lowercase();
                symptoms.iter().any(|s| content.contains(s.as_str()))
            })
    }

    pub fn quick_actions(&self, tier: Tier) -> Vec<String> {
        let actions: [String; 3] = match tier {
            Tier::Mild => [
                "Find Home Remedies".into(),
                "Track Symptoms".into(),
                "Schedule Checkup".into(),
            ],
            Tier::Moderate => [
                "Find Doctor".into(),
                "Schedule Appointment".into(),
                "Get Second Opinion".into(),
            ],
            Tier::Serious => [
                "Find Urgent Care".into(),
                "Call Doctor".into(),
                "Emergency Contacts".into(),
            ],
            Tier::Emergency => [
                format!("Call {}", self.emergency_number),
                "Find ER".into(),
                "Emergency Instructions".into(),
            ],
        };
        actions.to_vec()
    }

    fn medical(&self, turn: &Turn<'_>, tier: Tier) -> TriageReply {
        let symptoms: &[String] = if turn.entities.symptoms.is_empty() {
            &turn.context.symptoms
        } else {
            &turn.entities.symptoms
        };
        let recurring = self.is_recurring(&turn.entities.symptoms, turn.history);
        let note = if recurring { RECURRING_NOTE } else { "" };
        let prefix = empathy_prefix(turn.sentiment);
        let duration = turn.entities.duration.as_deref();

        let text = match tier {
            Tier::Mild => mild_text(prefix, symptoms, duration, note),
            Tier::Moderate => moderate_text(prefix, symptoms, duration, note),
            Tier::Serious => self.serious_text(prefix, symptoms, duration, note),
            Tier::Emergency => self.emergency_text(prefix, symptoms),
        };

        let follow_up = if tier <= Tier::Moderate {
            FOLLOW_UP_ROUTINE
        } else {
            FOLLOW_UP_URGENT
        };

        let mut reply = TriageReply::basic(ReplyKind::for_tier(tier), tier.level(), text)
            .with_follow_up(follow_up)
            .with_quick_actions(self.quick_actions(tier));
        reply.entities = Some(turn.entities.clone());
        reply.sentiment = Some(turn.sentiment);
        reply.recurring = Some(recurring);
        reply
    }

    fn serious_text(
        &self,
        prefix: &str,
        symptoms: &[String],
        duration: Option<&str>,
        note: &str,
    ) -> String {
        let n = &self.emergency_number;
        [
            "⚠️ **IMPORTANT MEDICAL ALERT**".to_string(),
            String::new(),
            format!(
                "{}Your symptoms{}{} are concerning and require prompt medical attention.",
                prefix,
                symptom_clause(symptoms),
                duration_clause(" for ", duration)
            ),
            String::new(),
            "**Critical Assessment:**".to_string(),
            "• Severity: HIGH".to_string(),
            "• Professional evaluation needed within 24 hours".to_string(),
            "• Do not delay seeking care".to_string(),
            String::new(),
            "**IMMEDIATE ACTIONS REQUIRED:**".to_string(),
            "1. **Contact Healthcare Provider TODAY**".to_string(),
            "   - Call your doctor immediately".to_string(),
            "   - If unavailable, visit urgent care".to_string(),
            "   - Do NOT wait to see if symptoms improve".to_string(),
            String::new(),
            "2. **Prepare for Medical Visit:**".to_string(),
            "   - List all symptoms and when they started".to_string(),
            "   - Note any medications you're taking".to_string(),
            "   - Bring your medical history".to_string(),
            "   - Have someone accompany you if possible".to_string(),
            String::new(),
            "3. **Monitor Closely:**".to_string(),
            "   - Watch for symptom progression".to_string(),
            "   - Keep emergency contacts ready".to_string(),
            format!("   - Prepare to call {} if symptoms worsen{}", n, note),
            String::new(),
            format!("**CALL {} OR GO TO ER IF:**", n),
            "• Chest pain or pressure".to_string(),
            "• Difficulty breathing or shortness of breath".to_string(),
            "• Severe bleeding".to_string(),
            "• Loss of consciousness".to_string(),
            "• Confusion or severe disorientation".to_string(),
            "• Sudden severe pain".to_string(),
            String::new(),
            "This is serious. Please prioritize getting medical care TODAY. Can someone help you get to a doctor?".to_string(),
        ]
        .join("\n")
    }

    /// Opens with the banner and ends with the closing line, so the guard
    /// chain passes it unchanged
    fn emergency_text(&self, prefix: &str, symptoms: &[String]) -> String {
        let n = &self.emergency_number;
        let listed = if symptoms.is_empty() {
            "The symptoms you described".to_string()
        } else {
            symptoms.join(", ")
        };

        let mut lines = vec![
            self.banner(),
            String::new(),
            "🚨 **MEDICAL EMERGENCY - IMMEDIATE ACTION REQUIRED** 🚨".to_string(),
            String::new(),
        ];
        if !prefix.is_empty() {
            lines.push(prefix.trim_end().to_string());
            lines.push(String::new());
        }
        lines.extend([
            format!("**CALL {} OR GO TO NEAREST EMERGENCY ROOM IMMEDIATELY**", n),
            String::new(),
            "Your symptoms indicate a potentially life-threatening situation:".to_string(),
            format!("• {}", listed),
            String::new(),
            "**DO THIS RIGHT NOW:**".to_string(),
            format!("1. **Call {}** - Do not drive yourself", n),
            "2. **Stay calm** - Help is coming".to_string(),
            "3. **Do not eat or drink** - May interfere with treatment".to_string(),
            "4. **Inform someone nearby** - You need help".to_string(),
            String::new(),
            "**While Waiting for Help:**".to_string(),
            "• Stay in a safe, comfortable position".to_string(),
            "• Loosen tight clothing".to_string(),
            "• Do not leave the person alone".to_string(),
            "• Have medical information ready (allergies, medications, conditions)".to_string(),
            String::new(),
            format!("**Critical Information to Provide to {}:**", n),
            "• Your exact symptoms".to_string(),
            "• When symptoms started".to_string(),
            "• Any known medical conditions".to_string(),
            "• Current medications".to_string(),
            "• Any allergies".to_string(),
            String::new(),
            "⚠️ **THIS IS A MEDICAL EMERGENCY. PROFESSIONAL EMERGENCY CARE IS ESSENTIAL.**"
                .to_string(),
            String::new(),
            format!("Are you able to call {} right now? Is someone with you?", n),
            String::new(),
            CLOSING_LINE.to_string(),
        ]);
        lines.join("\n")
    }
}

fn empathy_prefix(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Anxious => "I understand you're worried. Let me help calm your concerns. ",
        Sentiment::Negative => "I can see you're not feeling well. ",
        Sentiment::Positive | Sentiment::Neutral => "",
    }
}

fn symptom_clause(symptoms: &[String]) -> String {
    if symptoms.is_empty() {
        String::new()
    } else {
        format!(" ({})", symptoms.join(", "))
    }
}

fn duration_clause(joiner: &str, duration: Option<&str>) -> String {
    duration
        .map(|d| format!("{}{}", joiner, d))
        .unwrap_or_default()
}

fn mild_text(prefix: &str, symptoms: &[String], duration: Option<&str>, note: &str) -> String {
    [
        format!(
            "{}Based on your symptoms{}{}, this appears to be a mild condition.",
            prefix,
            symptom_clause(symptoms),
            duration_clause(" for ", duration)
        ),
        String::new(),
        "**My Assessment:**".to_string(),
        "• Severity: Mild".to_string(),
        "• Likely manageable with self-care".to_string(),
        "• Monitor for changes".to_string(),
        String::new(),
        "**Recommendations:**".to_string(),
        "1. **Rest**: Get adequate sleep (7-9 hours)".to_string(),
        "2. **Hydration**: Drink plenty of water".to_string(),
        "3. **Nutrition**: Eat balanced, light meals".to_string(),
        "4. **Monitor**: Keep track of symptom changes".to_string(),
        String::new(),
        "**When to Seek Help:**".to_string(),
        "• Symptoms persist beyond 3-5 days".to_string(),
        "• Symptoms worsen significantly".to_string(),
        format!("• New concerning symptoms develop{}", note),
        String::new(),
        "How are you feeling right now? Is there anything specific bothering you?".to_string(),
    ]
    .join("\n")
}

fn moderate_text(prefix: &str, symptoms: &[String], duration: Option<&str>, note: &str) -> String {
    [
        format!(
            "{}Your symptoms{}{} indicate a moderate condition that needs attention.",
            prefix,
            symptom_clause(symptoms),
            duration_clause(" lasting ", duration)
        ),
        String::new(),
        "**My Assessment:**".to_string(),
        "• Severity: Moderate".to_string(),
        "• Medical consultation recommended".to_string(),
        "• Should not be ignored".to_string(),
        String::new(),
        "**Immediate Actions:**".to_string(),
        "1. **Schedule Doctor Visit**: Within 24-48 hours".to_string(),
        "2. **Document Symptoms**: Note times, triggers, severity".to_string(),
        "3. **Avoid Self-Medication**: Wait for professional advice".to_string(),
        "4. **Rest**: Reduce physical activity".to_string(),
        String::new(),
        "**Warning Signs** (Seek immediate care if you experience):".to_string(),
        "• Sudden worsening of symptoms".to_string(),
        "• High fever (>103°F/39.4°C)".to_string(),
        "• Difficulty breathing".to_string(),
        format!("• Severe pain{}", note),
        String::new(),
        "Would you like help finding a suitable doctor in your area?".to_string(),
    ]
    .join("\n")
}

fn greeting(returning: bool) -> TriageReply {
    let text = if returning {
        "Hello again! How can I help you today? Are your symptoms improving?"
    } else {
        "Hello! I'm the MedTriage assistant. I can help you understand your symptoms and decide what care you need. How can I help you today?"
    };
    TriageReply::basic(ReplyKind::Greeting, 0, text.to_string())
        .with_follow_up(&["Tell me about your symptoms", "I need medical advice"])
        .with_quick_actions(vec![
            "Report Symptoms".to_string(),
            "Emergency".to_string(),
            "Find Doctor".to_string(),
        ])
}

fn gratitude() -> TriageReply {
    TriageReply::basic(
        ReplyKind::Acknowledgment,
        0,
        "You're welcome! I'm here to help anytime. Feel free to reach out if you have more questions or if your symptoms change. Stay healthy! 💚".to_string(),
    )
    .with_follow_up(&["Anything else I can help with?"])
}

fn farewell() -> TriageReply {
    TriageReply::basic(
        ReplyKind::Farewell,
        0,
        "Take care and feel better soon! Remember, I'm always here if you need medical guidance. Goodbye! 👋".to_string(),
    )
}

fn follow_up(context: &ConversationContext) -> TriageReply {
    let text = if context.symptoms.is_empty() {
        "I'm here to help. Could you tell me more about what you're experiencing?".to_string()
    } else {
        format!(
            "I understand you're still concerned about {}. Let me provide more details...",
            context.symptoms.join(", ")
        )
    };
    let tier = match context.severity {
        Some(SeverityWord::Severe) => Tier::Serious,
        Some(SeverityWord::Moderate) => Tier::Moderate,
        Some(SeverityWord::Mild) | None => Tier::Mild,
    };
    TriageReply::basic(ReplyKind::FollowUp, tier.level(), text)
        .with_follow_up(&["What specific information do you need?"])
}

fn redirect() -> TriageReply {
    TriageReply::basic(
        ReplyKind::Redirect,
        0,
        [
            "I'm specifically designed to help with medical and health-related concerns. I can assist with:",
            "",
            "• Symptom analysis and guidance",
            "• Emergency medical advice",
            "• Doctor recommendations",
            "• Medication information",
            "• Health tracking",
            "",
            "What health concern can I help you with today?",
        ]
        .join("\n"),
    )
    .with_follow_up(&["Tell me about your symptoms", "I need emergency help"])
}
