pub mod client;
#[cfg(test)]
pub(crate) mod fake_completions;
pub mod parse;
pub mod prompt;

use serde_json::Value;
use shared::StatsReport;

use self::client::LlmClient;
use self::parse::{error_payload, safe_json_parse};
use self::prompt::{
    ANALYSIS_MAX_TOKENS, FOLLOW_UP_MAX_TOKENS, build_analysis_prompt, build_follow_up_prompt,
};

/// Narrative for a fresh analysis. Transport failures degrade into an error payload.
pub async fn generate_insights(client: &LlmClient, plant_name: &str, report: &StatsReport) -> Value {
    let messages = build_analysis_prompt(plant_name, report);
    match client.complete(&messages, ANALYSIS_MAX_TOKENS).await {
        Ok(text) => safe_json_parse(&text),
        Err(e) => {
            log::error!("LLM insight generation failed for {}: {}", plant_name, e);
            error_payload(&format!("LLM request failed: {}", e), "")
        }
    }
}

pub async fn answer_follow_up(
    client: &LlmClient,
    plant_name: Option<&str>,
    stats: &Value,
    previous_response: Option<&Value>,
    question: &str,
) -> Result<Value, client::LlmError> {
    let messages = build_follow_up_prompt(plant_name, stats, previous_response, question);
    let text = client.complete(&messages, FOLLOW_UP_MAX_TOKENS).await?;
    Ok(safe_json_parse(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake_completions::FakeCompletions;
    use serde_json::json;
    use shared::{
        CareUrgency, DiseaseStage, ImageAnalysis, LifeExpectancyBand, PlantHealth,
        RecoveryPotential,
    };

    fn report() -> StatsReport {
        StatsReport {
            image_analysis: ImageAnalysis {
                mean_intensity: 137.5,
                std_intensity: 37.5,
                entropy: 1.0,
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

    #[actix_web::test]
    async fn insights_are_parsed_from_fenced_completion() {
        let server = FakeCompletions::start(
            "```json\n{\"diagnosis\": \"early blight\", \"care\": [\"remove lower leaves\"]}\n```",
        )
        .await;

        let insights = generate_insights(&server.client(), "tomato", &report()).await;
        assert_eq!(insights["diagnosis"], "early blight");
        assert_eq!(insights["care"][0], "remove lower leaves");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["model"], "test-model");
        assert_eq!(requests[0]["max_tokens"], ANALYSIS_MAX_TOKENS);
        let user_text = requests[0]["messages"][1]["content"].as_str().unwrap();
        assert!(user_text.contains("tomato"));
        server.stop().await;
    }

    #[actix_web::test]
    async fn unparseable_insights_keep_raw_text() {
        let server = FakeCompletions::start("The plant looks fine.").await;
        let insights = generate_insights(&server.client(), "tomato", &report()).await;
        assert!(insights["error"].is_string());
        assert_eq!(insights["raw"], "The plant looks fine.");
        server.stop().await;
    }

    #[actix_web::test]
    async fn follow_up_answer_uses_follow_up_budget() {
        let server = FakeCompletions::start("{\"answer\": \"Water weekly\"}").await;
        let previous = json!({"diagnosis": "early blight"});

        let reply = answer_follow_up(
            &server.client(),
            Some("tomato"),
            &json!({"health_score": 77.3}),
            Some(&previous),
            "How often should I water?",
        )
        .await
        .unwrap();
        assert_eq!(reply, json!({"answer": "Water weekly"}));

        let requests = server.requests();
        assert_eq!(requests[0]["max_tokens"], FOLLOW_UP_MAX_TOKENS);
        let last = requests[0]["messages"].as_array().unwrap().last().unwrap().clone();
        assert!(last["content"].as_str().unwrap().contains("How often should I water?"));
        server.stop().await;
    }
}
