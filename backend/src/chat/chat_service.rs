use serde_json::{Value, json};
use shared::{ChatTurn, ConversationResponse, StatsReport, ThreadSummary};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{ChatStore, RepositoryError};
use crate::llm::client::{LlmClient, LlmError};
use crate::llm::parse::safe_json_parse;
use crate::llm::prompt::{FOLLOW_UP_MAX_TOKENS, MAX_CONTEXT, context_window};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Message must not be empty")]
    EmptyMessage,
}

/// Thread operations scoped to an authenticated user.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    llm: LlmClient,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, llm: LlmClient) -> Self {
        Self { store, llm }
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub async fn list_threads(&self, user_id: Uuid) -> Result<Vec<ThreadSummary>, ChatError> {
        Ok(self.store.list_threads(user_id).await?)
    }

    pub async fn create_thread(&self, user_id: Uuid, user_email: &str) -> Result<Uuid, ChatError> {
        Ok(self.store.create_thread(user_id, user_email).await?)
    }

    /// Fails with `NotFound` unless `user_id` owns the thread.
    pub async fn ensure_owned(&self, thread_id: Uuid, user_id: Uuid) -> Result<(), ChatError> {
        self.store.get_thread(thread_id, user_id).await?;
        Ok(())
    }

    pub async fn conversation(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> Result<ConversationResponse, ChatError> {
        let thread = self.store.get_thread(thread_id, user_id).await?;
        Ok(ConversationResponse {
            chat_id: thread.id,
            title: thread.title,
            main_image: thread.main_image,
            conversation: thread.chat,
        })
    }

    /// Appends the user's message and the model's reply. Nothing is persisted if the model call fails.
    pub async fn continue_chat(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
        message: &str,
    ) -> Result<Vec<ChatTurn>, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut history = self.store.get_thread(thread_id, user_id).await?.chat;
        let user_turn = ChatTurn::user(message);
        history.push(user_turn.clone());
        let messages = context_window(&history, MAX_CONTEXT);

        let text = self.llm.complete(&messages, FOLLOW_UP_MAX_TOKENS).await?;
        let reply = safe_json_parse(&text);

        let turns = self
            .store
            .append_and_persist(thread_id, user_id, vec![user_turn, ChatTurn::assistant(reply)])
            .await?;
        log::info!("Thread {} now has {} turns after follow-up", thread_id, turns.len());
        Ok(turns)
    }

    /// Records a completed analysis as a user turn naming the plant and a structured assistant turn.
    pub async fn record_analysis(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
        plant_name: &str,
        image_key: Option<String>,
        report: &StatsReport,
        insights: &Value,
    ) -> Result<Vec<ChatTurn>, ChatError> {
        let mut thread = self.store.get_thread(thread_id, user_id).await?;
        thread.title = Some(plant_name.to_string());
        if image_key.is_some() {
            thread.main_image = image_key;
        }
        thread.append([
            ChatTurn::user(plant_name),
            ChatTurn::assistant(json!({ "analysis": report, "insights": insights })),
        ]);
        self.store.save_thread(&thread).await?;
        Ok(thread.chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSettings;
    use crate::db::memory_repository::InMemoryChatStore;
    use crate::llm::fake_completions::FakeCompletions;
    use assert_matches::assert_matches;
    use shared::{
        CareUrgency, DiseaseStage, ImageAnalysis, LifeExpectancyBand, PlantHealth,
        RecoveryPotential, Role, TurnContent,
    };
    use std::time::Duration;
    use url::Url;

    fn unreachable_llm() -> LlmClient {
        LlmClient::new(&LlmSettings {
            api_key: "test-key".into(),
            base_url: Url::parse("http://127.0.0.1:9/v1").unwrap(),
            model: "test-model".into(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn service() -> ChatService {
        ChatService::new(Arc::new(InMemoryChatStore::new()), unreachable_llm())
    }

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
    async fn analysis_is_recorded_with_title_and_image() {
        let chat = service();
        let user = Uuid::new_v4();
        let id = chat.create_thread(user, "grower@example.com").await.unwrap();

        let insights = json!({"diagnosis": "mild stress"});
        let turns = chat
            .record_analysis(id, user, "potato", Some("images/k.png".into()), &report(), &insights)
            .await
            .unwrap();

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_matches!(&turns[1].content, TurnContent::Structured(v) if v["insights"] == insights);

        let conversation = chat.conversation(id, user).await.unwrap();
        assert_eq!(conversation.title.as_deref(), Some("potato"));
        assert_eq!(conversation.main_image.as_deref(), Some("images/k.png"));

        let summaries = chat.list_threads(user).await.unwrap();
        assert_eq!(summaries[0].title.as_deref(), Some("potato"));
    }

    #[actix_web::test]
    async fn failed_model_call_leaves_thread_untouched() {
        let chat = service();
        let user = Uuid::new_v4();
        let id = chat.create_thread(user, "grower@example.com").await.unwrap();

        assert_matches!(
            chat.continue_chat(id, user, "Is it getting worse?").await,
            Err(ChatError::Llm(_))
        );
        assert!(chat.conversation(id, user).await.unwrap().conversation.is_empty());
    }

    #[actix_web::test]
    async fn follow_up_checks_message_and_ownership() {
        let chat = service();
        let owner = Uuid::new_v4();
        let id = chat.create_thread(owner, "a@example.com").await.unwrap();

        assert_matches!(chat.continue_chat(id, owner, "   ").await, Err(ChatError::EmptyMessage));
        assert_matches!(
            chat.continue_chat(id, Uuid::new_v4(), "hello").await,
            Err(ChatError::Repository(RepositoryError::NotFound))
        );
    }

    #[actix_web::test]
    async fn ownership_check_rejects_other_users() {
        let chat = service();
        let owner = Uuid::new_v4();
        let id = chat.create_thread(owner, "a@example.com").await.unwrap();

        assert!(chat.ensure_owned(id, owner).await.is_ok());
        assert_matches!(
            chat.ensure_owned(id, Uuid::new_v4()).await,
            Err(ChatError::Repository(RepositoryError::NotFound))
        );
        assert_matches!(
            chat.ensure_owned(Uuid::new_v4(), owner).await,
            Err(ChatError::Repository(RepositoryError::NotFound))
        );
    }

    #[actix_web::test]
    async fn follow_up_persists_parsed_reply_with_capped_context() {
        let server = FakeCompletions::start(
            "```json\n{\"answer\": \"Recovering well\", \"recommendations\": [\"keep watering\"]}\n```",
        )
        .await;
        let store = Arc::new(InMemoryChatStore::new());
        let chat = ChatService::new(store.clone(), server.client());
        let user = Uuid::new_v4();
        let id = chat.create_thread(user, "grower@example.com").await.unwrap();

        let mut thread = store.get_thread(id, user).await.unwrap();
        thread.append((0..12).map(|i| {
            if i % 2 == 0 {
                ChatTurn::user(format!("question {}", i))
            } else {
                ChatTurn::assistant(json!({ "answer": format!("answer {}", i) }))
            }
        }));
        store.save_thread(&thread).await.unwrap();

        let turns = chat.continue_chat(id, user, "  Is it recovering?  ").await.unwrap();
        assert_eq!(turns.len(), 14);
        assert_eq!(turns[12], ChatTurn::user("Is it recovering?"));
        assert_matches!(
            &turns[13].content,
            TurnContent::Structured(v) if v["answer"] == "Recovering well"
        );
        assert_eq!(chat.conversation(id, user).await.unwrap().conversation, turns);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["max_tokens"], FOLLOW_UP_MAX_TOKENS);
        let messages = requests[0]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), MAX_CONTEXT + 1);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "question 4");
        assert_eq!(messages[10]["role"], "user");
        assert_eq!(messages[10]["content"], "Is it recovering?");
        server.stop().await;
    }
}
