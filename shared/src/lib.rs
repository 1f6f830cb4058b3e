use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DiseaseStage {
    Healthy,
    EarlyStress,
    ModerateStress,
    SevereStress,
}

impl DiseaseStage {
    /// Bands are closed below and open above: 20.0 is already `EarlyStress`.
    pub fn from_severity(severity: f64) -> Self {
        if severity < 20.0 {
            DiseaseStage::Healthy
        } else if severity < 40.0 {
            DiseaseStage::EarlyStress
        } else if severity < 65.0 {
            DiseaseStage::ModerateStress
        } else {
            DiseaseStage::SevereStress
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeExpectancyBand {
    Long,
    Medium,
    Short,
}

impl LifeExpectancyBand {
    pub fn from_health_score(health_score: f64) -> Self {
        if health_score > 70.0 {
            LifeExpectancyBand::Long
        } else if health_score > 40.0 {
            LifeExpectancyBand::Medium
        } else {
            LifeExpectancyBand::Short
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPotential {
    High,
    Medium,
    Low,
}

impl RecoveryPotential {
    pub fn from_health_score(health_score: f64) -> Self {
        if health_score > 70.0 {
            RecoveryPotential::High
        } else if health_score > 40.0 {
            RecoveryPotential::Medium
        } else {
            RecoveryPotential::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CareUrgency {
    Low,
    Medium,
    High,
}

impl CareUrgency {
    /// Inverse of [`RecoveryPotential`] over the same 70/40 thresholds.
    pub fn from_health_score(health_score: f64) -> Self {
        match RecoveryPotential::from_health_score(health_score) {
            RecoveryPotential::High => CareUrgency::Low,
            RecoveryPotential::Medium => CareUrgency::Medium,
            RecoveryPotential::Low => CareUrgency::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn from_percentage(stress_percentage: f64) -> Self {
        if stress_percentage < 15.0 {
            StressLevel::Low
        } else if stress_percentage < 40.0 {
            StressLevel::Medium
        } else {
            StressLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub mean_intensity: f64,
    pub std_intensity: f64,
    pub entropy: f64,
    pub infected_area_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantHealth {
    pub stress_percentage: f64,
    pub disease_stage: DiseaseStage,
    pub health_score: f64,
    pub survivability_score: f64,
    pub life_expectancy_band: LifeExpectancyBand,
    pub recovery_potential: RecoveryPotential,
    pub care_urgency: CareUrgency,
}

/// Verified analytics for one image. Every number here comes from pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub image_analysis: ImageAnalysis,
    pub plant_health: PlantHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalSummary {
    pub mean_intensity: f64,
    pub max_intensity: u8,
    pub min_intensity: u8,
    pub stress_percentage: f64,
    pub stress_level: StressLevel,
}

/// Base64-encoded PNG renderings produced during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisImages {
    pub enhanced: String,
    pub thermal: String,
    pub stress_mask: String,
    pub stress_overlay: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub plant_name: String,
    pub analysis: StatsReport,
    pub thermal_summary: ThermalSummary,
    pub images: AnalysisImages,
    pub insights: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Structured(serde_json::Value),
}

impl TurnContent {
    /// Text for an outbound model message; structured content is sent as compact JSON.
    pub fn to_message_text(&self) -> String {
        match self {
            TurnContent::Text(text) => text.clone(),
            TurnContent::Structured(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(value: serde_json::Value) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Structured(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub main_image: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub chat_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    pub conversation: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
    pub chat_id: Uuid,
    pub conversation: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRequest {
    #[serde(default)]
    pub plant_name: Option<String>,
    pub stats: serde_json::Value,
    #[serde(default)]
    pub previous_response: Option<serde_json::Value>,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpResponse {
    pub reply: serde_json::Value,
}
