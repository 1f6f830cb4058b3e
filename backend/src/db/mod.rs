pub mod dynamodb_repository;
pub mod memory_repository;
pub mod models;

use async_trait::async_trait;
use shared::{ChatTurn, ThreadSummary};
use uuid::Uuid;

use self::models::ChatThread;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

/// Persistence boundary for chat threads. Writes replace the whole thread document.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Threads owned by `user_id`, most recently updated first.
    async fn list_threads(&self, user_id: Uuid) -> Result<Vec<ThreadSummary>, RepositoryError>;

    async fn create_thread(&self, user_id: Uuid, user_email: &str) -> Result<Uuid, RepositoryError>;

    /// Fails with `NotFound` when the thread is absent or owned by someone else.
    async fn get_thread(&self, thread_id: Uuid, user_id: Uuid) -> Result<ChatThread, RepositoryError>;

    async fn save_thread(&self, thread: &ChatThread) -> Result<(), RepositoryError>;

    async fn append_and_persist(
        &self,
        thread_id: Uuid,
        user_id: Uuid,
        new_turns: Vec<ChatTurn>,
    ) -> Result<Vec<ChatTurn>, RepositoryError> {
        let mut thread = self.get_thread(thread_id, user_id).await?;
        thread.append(new_turns);
        self.save_thread(&thread).await?;
        Ok(thread.chat)
    }
}
