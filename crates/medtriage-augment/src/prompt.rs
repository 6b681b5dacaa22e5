//! Prompt assembly for the generative backend

use crate::augmenter::AugmentRequest;

/// Standing instruction for normal (non-emergency) turns
pub const SAFETY_INSTRUCTION: &str = "\
You are a Safety-First Medical Triage Assistant.
Your ONLY goal is determining if a user needs professional care.

**ZERO TOLERANCE RULES:**
1. ⛔ NO DIAGNOSIS: Never state \"You have [Disease]\". Use \"Symptoms are consistent with...\"
2. ⛔ NO CERTAINTY: Always use \"may\", \"could\", \"associated with\".
3. ⛔ NO STATISTICS: Do not invent numbers.
4. ⛔ NO GUESSING: If unsure, advise seeing a doctor immediately.

**RESPONSE PROTOCOL:**
1. Triage: classify as **Mild (Self-care)**, **Moderate (Doctor soon)** or **Severe (Immediate care)**, using ONLY the severity given below.
2. Potential indicators, non-diagnostic: \"These symptoms are often associated with...\"
3. Actionable safety advice: monitoring, hydration, rest. Never name prescription drugs.
4. Escalation: \"If symptoms persist for more than 2 days...\", \"If pain increases...\"
5. Disclaimer: \"⚠️ **Consult a Doctor:** This is an AI triage tool, not a diagnosis.\"

**HIGH-RISK OVERRIDE:**
If ANY red flag appears (chest pain, breathing difficulty, severe bleeding, confusion, blue lips or skin):
- STOP ANALYSIS.
- Respond: \"This sounds like a medical emergency. Go to the nearest ER immediately.\"

**TONE:** authoritative on safety, conservative on medicine, clear and direct.";

/// Full prompt text. An override instruction replaces the safety instruction
/// entirely and switches to the emergency response contract.
pub fn build_prompt(request: &AugmentRequest<'_>) -> String {
    match request.override_prompt {
        Some(instruction) => format!(
            "{instruction}\n\n\
             User's emergency message: \"{message}\"\n\n\
             Respond according to EMERGENCY CONTEXT MODE rules above. You MUST:\n\
             1. Start with \"{banner}\"\n\
             2. Explain why in ONE sentence\n\
             3. Give 3-4 immediate safety actions ONLY (while waiting for help)\n\
             4. End with \"Emergency services are the ONLY proper response. I cannot replace them.\"\n\n\
             Do NOT diagnose. Do NOT treat. Do NOT reassure. ONLY safety guidance.",
            instruction = instruction,
            message = request.message,
            banner = request.banner,
        ),
        None => {
            let symptoms = if request.symptoms.is_empty() {
                "none identified".to_string()
            } else {
                request.symptoms.join(", ")
            };
            let mut prompt = format!(
                "{}\n\nAssessed severity: {}/4\nDetected symptoms: {}\n",
                SAFETY_INSTRUCTION, request.tier, symptoms
            );
            if let Some(line) = request.context_line.filter(|l| !l.is_empty()) {
                prompt.push_str(&format!("Conversation context: {}\n", line));
            }
            prompt.push_str(&format!("\nUser message: \"{}\"", request.message));
            prompt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(symptoms: &'a [String], override_prompt: Option<&'a str>) -> AugmentRequest<'a> {
        AugmentRequest {
            message: "fever since yesterday",
            symptoms,
            tier: 2,
            override_prompt,
            context_line: Some("Previous messages: 2"),
            banner: "🚨 CALL 112 IMMEDIATELY",
        }
    }

    #[test]
    fn test_normal_prompt() {
        let symptoms = vec!["fever".to_string()];
        let prompt = build_prompt(&request(&symptoms, None));
        assert!(prompt.starts_with(SAFETY_INSTRUCTION));
        assert!(prompt.contains("Assessed severity: 2/4"));
        assert!(prompt.contains("Detected symptoms: fever"));
        assert!(prompt.contains("Conversation context: Previous messages: 2"));
        assert!(prompt.ends_with("User message: \"fever since yesterday\""));
    }

    #[test]
    fn test_override_replaces_instruction() {
        let prompt = build_prompt(&request(&[], Some("[EMERGENCY CONTEXT MODE]")));
        assert!(prompt.starts_with("[EMERGENCY CONTEXT MODE]"));
        assert!(!prompt.contains(SAFETY_INSTRUCTION));
        assert!(prompt.contains("1. Start with \"🚨 CALL 112 IMMEDIATELY\""));
        assert!(prompt.contains("User's emergency message: \"fever since yesterday\""));
    }
}
