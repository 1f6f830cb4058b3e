use serde::Serialize;
use serde_json::Value;
use shared::{ChatTurn, Role, StatsReport};

pub const ANALYSIS_KEYS: [&str; 4] = ["diagnosis", "possible_causes", "prevention", "care_plan"];
pub const FOLLOW_UP_KEYS: [&str; 2] = ["answer", "recommendations"];

pub const ANALYSIS_MAX_TOKENS: u32 = 600;
pub const FOLLOW_UP_MAX_TOKENS: u32 = 800;
pub const MAX_CONTEXT: usize = 10;

const SYSTEM_PROMPT: &str = "You are an agricultural plant-health expert. \
    You respond only with a single JSON object and no surrounding text.";

const THREAD_SYSTEM_PROMPT: &str = "You are an agricultural plant-health expert continuing a \
    conversation about a plant analysis. Verified analytics earlier in the conversation are final: \
    do not recalculate, alter or invent numeric values. Respond only with a single JSON object \
    with the keys \"answer\" and \"recommendations\".";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmMessage {
    pub role: Role,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

fn key_list(keys: &[&str]) -> String {
    keys.iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn build_analysis_prompt(plant_name: &str, report: &StatsReport) -> Vec<LlmMessage> {
    let user = format!(
        "Plant: {plant}\n\
         Verified analytics (computed from the image, treat as ground truth):\n{stats}\n\n\
         Using only these analytics, explain the plant's likely condition, what may be causing it, \
         how to prevent it from worsening and how to care for the plant.\n\
         Rules:\n\
         - Do not invent numbers. Quote values exactly as given when you reference them.\n\
         - Do not recalculate or contradict the analytics.\n\
         - Respond ONLY in JSON with exactly these keys: {keys}.",
        plant = plant_name,
        stats = pretty(report),
        keys = key_list(&ANALYSIS_KEYS),
    );
    vec![
        LlmMessage::new(Role::System, SYSTEM_PROMPT),
        LlmMessage::new(Role::User, user),
    ]
}

pub fn build_follow_up_prompt(
    plant_name: Option<&str>,
    stats: &Value,
    previous_response: Option<&Value>,
    question: &str,
) -> Vec<LlmMessage> {
    let previous = previous_response
        .map(|value| pretty(value))
        .unwrap_or_else(|| "(none)".to_string());
    let user = format!(
        "Plant: {plant}\n\
         Plant health context (verified, final):\n{stats}\n\n\
         Your previous response:\n{previous}\n\n\
         User question: {question}\n\n\
         Rules:\n\
         - Do not recalculate or re-derive any numeric stats; refer to them as given.\n\
         - Do not invent numbers.\n\
         - Respond ONLY in JSON with exactly these keys: {keys}.",
        plant = plant_name.unwrap_or("unknown"),
        stats = pretty(stats),
        previous = previous,
        question = question,
        keys = key_list(&FOLLOW_UP_KEYS),
    );
    vec![
        LlmMessage::new(Role::System, SYSTEM_PROMPT),
        LlmMessage::new(Role::User, user),
    ]
}

/// Messages for a stored thread: a fixed system instruction, then the most recent `limit` turns.
pub fn context_window(turns: &[ChatTurn], limit: usize) -> Vec<LlmMessage> {
    let start = turns.len().saturating_sub(limit);
    std::iter::once(LlmMessage::new(Role::System, THREAD_SYSTEM_PROMPT))
        .chain(
            turns[start..]
                .iter()
                .map(|turn| LlmMessage::new(turn.role, turn.content.to_message_text())),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{
        CareUrgency, DiseaseStage, ImageAnalysis, LifeExpectancyBand, PlantHealth,
        RecoveryPotential,
    };

    fn report() -> StatsReport {
        StatsReport {
            image_analysis: ImageAnalysis {
                mean_intensity: 137.5,
                std_intensity: 21.25,
                entropy: 4.9,
                infected_area_percent: 10.0,
            },
            plant_health: PlantHealth {
                stress_percentage: 41.75,
                disease_stage: DiseaseStage::EarlyStress,
                health_score: 77.3,
                survivability_score: 0.77,
                life_expectancy_band: LifeExpectancyBand::Long,
                recovery_potential: RecoveryPotential::High,
                care_urgency: CareUrgency::Low,
            },
        }
    }

    #[test]
    fn analysis_prompt_embeds_stats_and_constraints() {
        let messages = build_analysis_prompt("potato", &report());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let user = &messages[1].content;
        assert!(user.contains("Plant: potato"));
        assert!(user.contains("\"stress_percentage\": 41.75"));
        assert!(user.contains("\"disease_stage\": \"EARLY_STRESS\""));
        assert!(user.contains("Do not invent numbers"));
        for key in ANALYSIS_KEYS {
            assert!(user.contains(&format!("\"{}\"", key)), "missing key {}", key);
        }
    }

    #[test]
    fn follow_up_prompt_carries_context_and_question() {
        let stats = json!({"plant_health": {"health_score": 77.3}});
        let previous = json!({"diagnosis": "mild heat stress"});
        let messages =
            build_follow_up_prompt(Some("tomato"), &stats, Some(&previous), "Should I water more?");
        let user = &messages[1].content;
        assert!(user.contains("77.3"));
        assert!(user.contains("mild heat stress"));
        assert!(user.contains("User question: Should I water more?"));
        assert!(user.contains("Do not recalculate"));
    }

    #[test]
    fn follow_up_without_previous_response() {
        let messages = build_follow_up_prompt(None, &json!({}), None, "why?");
        assert!(messages[1].content.contains("(none)"));
        assert!(messages[1].content.contains("Plant: unknown"));
    }

    #[test]
    fn context_window_keeps_most_recent_turns() {
        let turns: Vec<ChatTurn> = (0..15)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("q{}", i))
                } else {
                    ChatTurn::assistant(json!({"answer": i}))
                }
            })
            .collect();

        let messages = context_window(&turns, MAX_CONTEXT);
        assert_eq!(messages.len(), MAX_CONTEXT + 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, r#"{"answer":5}"#);
        assert_eq!(messages.last().unwrap().content, "q14");
    }

    #[test]
    fn context_window_with_short_history() {
        let turns = vec![ChatTurn::user("hello")];
        let messages = context_window(&turns, MAX_CONTEXT);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
    }
}
