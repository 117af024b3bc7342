//! Message repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tcf_core::{MessageBody, MessageKind, Paginated, Pagination, ValidationError};

use super::conversations::Conversation;
use super::{Caller, DbError};

/// Message record from database
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    /// `None` for system messages
    pub sender_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Message repository
pub struct MessageRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Send a message and bump the conversation's `last_message_at` in the
    /// same transaction.
    pub async fn send(
        &self,
        conversation_id: i64,
        caller: Caller,
        kind: MessageKind,
        body: MessageBody,
        now: DateTime<Utc>,
    ) -> Result<Message, DbError> {
        if !kind.is_user_sendable() {
            return Err(ValidationError::InvalidVariant {
                field: "message type",
                value: kind.to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let conversation: Conversation = sqlx::query_as(
            r#"
            SELECT id, initiator_id, participant_id, listing_id, kind, last_message_at, created_at
            FROM conversations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("conversation", conversation_id))?;

        if !conversation.includes(caller.user_id) {
            return Err(DbError::not_found("conversation", conversation_id));
        }

        let message: Message = sqlx::query_as(
            r#"
            INSERT INTO messages (conversation_id, sender_id, kind, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, sender_id, kind, content, created_at
            "#,
        )
        .bind(conversation_id)
        .bind(caller.user_id)
        .bind(kind.as_str())
        .bind(body.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Messages of a conversation, oldest first.
    ///
    /// Callers must have checked the caller's membership.
    pub async fn list_for_conversation(
        &self,
        conversation_id: i64,
        page: Pagination,
    ) -> Result<Paginated<Message>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, kind, content, created_at,
                   COUNT(*) OVER() AS total
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Message::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }
}
