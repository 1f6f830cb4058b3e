use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use shared::{ChatTurn, ThreadSummary};
use std::collections::HashMap;
use uuid::Uuid;

use super::models::{ChatThread, sort_recent_first};
use super::{ChatStore, RepositoryError};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbChatStore {
    client: Client,
    chats_table: String,
}

impl DynamoDbChatStore {
    pub fn new(client: Client, chats_table: String) -> Self {
        Self {
            client,
            chats_table,
        }
    }

    /// Checks the table is reachable; called once at startup.
    pub async fn verify_table(&self) -> Result<(), RepositoryError> {
        match self
            .client
            .describe_table()
            .table_name(&self.chats_table)
            .send()
            .await
        {
            Ok(response) => {
                log::info!(
                    "DynamoDB table '{}' exists with status: {:?}",
                    self.chats_table,
                    response.table().and_then(|t| t.table_status())
                );
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "DynamoDB table '{}' does not exist or is not accessible: {:?}",
                    self.chats_table,
                    e
                );
                Err(RepositoryError::DynamoDb(format!(
                    "Table '{}' not accessible: {}",
                    self.chats_table, e
                )))
            }
        }
    }

    async fn scan_user_items(&self, user_id: Uuid) -> Result<Vec<Item>, RepositoryError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(&self.chats_table)
                .filter_expression("user_id = :user_id")
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

            if let Some(page) = result.items {
                items.extend(page);
            }
            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl ChatStore for DynamoDbChatStore {
    async fn list_threads(&self, user_id: Uuid) -> Result<Vec<ThreadSummary>, RepositoryError> {
        let mut summaries = self
            .scan_user_items(user_id)
            .await?
            .iter()
            .map(parse_summary_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        sort_recent_first(&mut summaries);
        Ok(summaries)
    }

    async fn create_thread(&self, user_id: Uuid, user_email: &str) -> Result<Uuid, RepositoryError> {
        let thread = ChatThread::new(user_id, user_email.to_string());
        self.save_thread(&thread).await?;
        log::info!("Created chat thread {} for user {}", thread.id, user_id);
        Ok(thread.id)
    }

    async fn get_thread(&self, thread_id: Uuid, user_id: Uuid) -> Result<ChatThread, RepositoryError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(thread_id.to_string()));

        let result = self
            .client
            .get_item()
            .table_name(&self.chats_table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        let thread = match result.item {
            Some(item) => parse_thread_from_item(&item)?,
            None => return Err(RepositoryError::NotFound),
        };

        if !thread.is_owned_by(user_id) {
            log::warn!("User {} requested thread {} owned by another user", user_id, thread_id);
            return Err(RepositoryError::NotFound);
        }
        Ok(thread)
    }

    async fn save_thread(&self, thread: &ChatThread) -> Result<(), RepositoryError> {
        let item = thread_to_item(thread)?;

        match self
            .client
            .put_item()
            .table_name(&self.chats_table)
            .set_item(Some(item))
            .send()
            .await
        {
            Ok(_) => {
                log::debug!("Saved chat thread {} ({} turns)", thread.id, thread.chat.len());
                Ok(())
            }
            Err(e) => {
                log::error!("DynamoDB put_item failed for thread {}: {:?}", thread.id, e);
                let error_msg = if let Some(service_err) = e.as_service_error() {
                    format!("Service error: {:?}", service_err)
                } else {
                    format!("SDK error: {}", e)
                };
                Err(RepositoryError::DynamoDb(error_msg))
            }
        }
    }
}

fn thread_to_item(thread: &ChatThread) -> Result<Item, RepositoryError> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(thread.id.to_string()));
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(thread.user_id.to_string()),
    );
    item.insert(
        "user_email".to_string(),
        AttributeValue::S(thread.user_email.clone()),
    );
    if let Some(title) = &thread.title {
        item.insert("title".to_string(), AttributeValue::S(title.clone()));
    }
    if let Some(main_image) = &thread.main_image {
        item.insert(
            "main_image".to_string(),
            AttributeValue::S(main_image.clone()),
        );
    }
    item.insert(
        "chat".to_string(),
        AttributeValue::S(serde_json::to_string(&thread.chat)?),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(thread.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(thread.updated_at.to_rfc3339()),
    );
    Ok(item)
}

fn uuid_attr(item: &Item, name: &str) -> Result<Uuid, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", name)))
}

fn time_attr(item: &Item, name: &str) -> Option<DateTime<Utc>> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

fn parse_summary_from_item(item: &Item) -> Result<ThreadSummary, RepositoryError> {
    Ok(ThreadSummary {
        id: uuid_attr(item, "id")?,
        title: string_attr(item, "title"),
        main_image: string_attr(item, "main_image"),
        updated_at: time_attr(item, "updated_at")
            .ok_or_else(|| RepositoryError::InvalidData("Invalid updated_at".to_string()))?,
    })
}

fn parse_thread_from_item(item: &Item) -> Result<ChatThread, RepositoryError> {
    let chat: Vec<ChatTurn> = match item.get("chat").and_then(|v| v.as_s().ok()) {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };

    let created_at = time_attr(item, "created_at")
        .ok_or_else(|| RepositoryError::InvalidData("Invalid created_at".to_string()))?;

    Ok(ChatThread {
        id: uuid_attr(item, "id")?,
        user_id: uuid_attr(item, "user_id")?,
        user_email: string_attr(item, "user_email").unwrap_or_default(),
        title: string_attr(item, "title"),
        main_image: string_attr(item, "main_image"),
        chat,
        created_at,
        updated_at: time_attr(item, "updated_at").unwrap_or(created_at),
    })
}
