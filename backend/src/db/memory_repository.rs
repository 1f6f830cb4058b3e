use async_trait::async_trait;
use shared::ThreadSummary;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{ChatThread, sort_recent_first};
use super::{ChatStore, RepositoryError};

/// Process-local store used when no DynamoDB table is configured. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryChatStore {
    threads: RwLock<HashMap<Uuid, ChatThread>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn list_threads(&self, user_id: Uuid) -> Result<Vec<ThreadSummary>, RepositoryError> {
        let threads = self.threads.read().await;
        let mut summaries: Vec<ThreadSummary> = threads
            .values()
            .filter(|t| t.is_owned_by(user_id))
            .map(ChatThread::summary)
            .collect();
        sort_recent_first(&mut summaries);
        Ok(summaries)
    }

    async fn create_thread(&self, user_id: Uuid, user_email: &str) -> Result<Uuid, RepositoryError> {
        let thread = ChatThread::new(user_id, user_email.to_string());
        let id = thread.id;
        self.threads.write().await.insert(id, thread);
        Ok(id)
    }

    async fn get_thread(&self, thread_id: Uuid, user_id: Uuid) -> Result<ChatThread, RepositoryError> {
        self.threads
            .read()
            .await
            .get(&thread_id)
            .filter(|t| t.is_owned_by(user_id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_thread(&self, thread: &ChatThread) -> Result<(), RepositoryError> {
        self.threads.write().await.insert(thread.id, thread.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use shared::ChatTurn;

    #[actix_web::test]
    async fn created_thread_starts_empty() {
        let store = InMemoryChatStore::new();
        let user = Uuid::new_v4();
        let id = store.create_thread(user, "grower@example.com").await.unwrap();

        let thread = store.get_thread(id, user).await.unwrap();
        assert!(thread.chat.is_empty());
        assert_eq!(thread.user_email, "grower@example.com");
    }

    #[actix_web::test]
    async fn other_users_cannot_read_thread() {
        let store = InMemoryChatStore::new();
        let owner = Uuid::new_v4();
        let id = store.create_thread(owner, "a@example.com").await.unwrap();

        assert_matches!(
            store.get_thread(id, Uuid::new_v4()).await,
            Err(RepositoryError::NotFound)
        );
        assert_matches!(
            store.append_and_persist(id, Uuid::new_v4(), vec![ChatTurn::user("hi")]).await,
            Err(RepositoryError::NotFound)
        );
        assert_matches!(
            store.get_thread(Uuid::new_v4(), owner).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[actix_web::test]
    async fn append_persists_full_history() {
        let store = InMemoryChatStore::new();
        let user = Uuid::new_v4();
        let id = store.create_thread(user, "a@example.com").await.unwrap();

        store.append_and_persist(id, user, vec![ChatTurn::user("one")]).await.unwrap();
        let turns = store
            .append_and_persist(
                id,
                user,
                vec![ChatTurn::user("two"), ChatTurn::assistant(serde_json::json!({"answer": "ok"}))],
            )
            .await
            .unwrap();

        assert_eq!(turns.len(), 3);
        assert_eq!(store.get_thread(id, user).await.unwrap().chat, turns);
    }

    #[actix_web::test]
    async fn list_is_scoped_and_sorted_by_update() {
        let store = InMemoryChatStore::new();
        let user = Uuid::new_v4();
        let older = store.create_thread(user, "a@example.com").await.unwrap();
        let newer = store.create_thread(user, "a@example.com").await.unwrap();
        store.create_thread(Uuid::new_v4(), "b@example.com").await.unwrap();

        let mut thread = store.get_thread(older, user).await.unwrap();
        thread.updated_at = Utc::now() - Duration::hours(1);
        store.save_thread(&thread).await.unwrap();

        let summaries = store.list_threads(user).await.unwrap();
        let ids: Vec<Uuid> = summaries.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer, older]);
    }
}
