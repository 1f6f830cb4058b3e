use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ChatTurn, ThreadSummary};
use uuid::Uuid;

/// One persisted conversation document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub title: Option<String>,
    pub main_image: Option<String>,
    pub chat: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn new(user_id: Uuid, user_email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_email,
            title: None,
            main_image: None,
            chat: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn append(&mut self, turns: impl IntoIterator<Item = ChatTurn>) {
        self.chat.extend(turns);
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id,
            title: self.title.clone(),
            main_image: self.main_image.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Sorts summaries by last update, newest first.
pub fn sort_recent_first(summaries: &mut [ThreadSummary]) {
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
