use crate::{
    entities::{chat_message, ChatMessage, ChatMessageModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Append-only chat log. Unrelated to the commerce flow.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ChatService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, text), fields(customer_id = %customer_id))]
    pub async fn post_message(
        &self,
        customer_id: Uuid,
        text: &str,
    ) -> Result<ChatMessageModel, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::ValidationError(
                "message text must not be empty".to_string(),
            ));
        }

        let message = chat_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            text: Set(text.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now()),
        };
        let message = message.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ChatMessagePosted(message.id))
            .await;
        Ok(message)
    }

    /// Chronological message history for one customer.
    pub async fn list_messages(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ChatMessageModel>, u64), ServiceError> {
        let paginator = ChatMessage::find()
            .filter(chat_message::Column::CustomerId.eq(customer_id))
            .order_by_asc(chat_message::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let messages = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((messages, total))
    }

    /// Marks the listed messages as read.
    pub async fn mark_read(&self, ids: &[Uuid]) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = ChatMessage::update_many()
            .col_expr(chat_message::Column::IsRead, sea_orm::sea_query::Expr::value(true))
            .filter(chat_message::Column::Id.is_in(ids.to_vec()))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
