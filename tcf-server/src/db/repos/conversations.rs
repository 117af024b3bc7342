//! Conversation repository
//!
//! A conversation is between exactly two users, optionally about a listing.
//! The pair is stored unordered: (a, b) and (b, a) resolve to the same row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Row};

use tcf_core::{ConversationKind, MessageKind, Paginated, Pagination};

use super::{Caller, DbError};

const CONVERSATION_COLUMNS: &str = r#"
    c.id, c.initiator_id, c.participant_id, c.listing_id, c.kind, c.last_message_at,
    c.created_at
"#;

/// Conversation record from database
#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub initiator_id: i64,
    pub participant_id: i64,
    pub listing_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub kind: ConversationKind,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: i64) -> bool {
        self.initiator_id == user_id || self.participant_id == user_id
    }

    /// The participant on the other side from `user_id`.
    pub fn other(&self, user_id: i64) -> i64 {
        if self.initiator_id == user_id {
            self.participant_id
        } else {
            self.initiator_id
        }
    }
}

/// Inbox row: a conversation with the counterpart and latest message
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub kind: ConversationKind,
    pub listing_id: Option<i64>,
    pub listing_name: Option<String>,
    pub other_user_id: i64,
    pub other_username: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Find or create the conversation between two users about a listing.
pub(crate) async fn ensure_conversation(
    conn: &mut PgConnection,
    initiator_id: i64,
    participant_id: i64,
    listing_id: Option<i64>,
    kind: ConversationKind,
) -> Result<Conversation, DbError> {
    if initiator_id == participant_id {
        return Err(DbError::conflict("cannot start a conversation with yourself"));
    }

    let inserted: Option<Conversation> = sqlx::query_as(&format!(
        r#"
        INSERT INTO conversations AS c (initiator_id, participant_id, listing_id, kind)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING
        RETURNING {CONVERSATION_COLUMNS}
        "#
    ))
    .bind(initiator_id)
    .bind(participant_id)
    .bind(listing_id)
    .bind(kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(conversation) = inserted {
        tracing::debug!(conversation_id = conversation.id, %kind, "conversation created");
        return Ok(conversation);
    }

    find_between(conn, initiator_id, participant_id, listing_id, kind)
        .await?
        .ok_or_else(|| DbError::conflict("conversation could not be created"))
}

/// The existing conversation for an unordered pair, listing and kind.
pub(crate) async fn find_between(
    conn: &mut PgConnection,
    a: i64,
    b: i64,
    listing_id: Option<i64>,
    kind: ConversationKind,
) -> Result<Option<Conversation>, DbError> {
    let conversation = sqlx::query_as(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}
        FROM conversations c
        WHERE LEAST(c.initiator_id, c.participant_id) = LEAST($1::bigint, $2::bigint)
          AND GREATEST(c.initiator_id, c.participant_id) = GREATEST($1::bigint, $2::bigint)
          AND c.listing_id IS NOT DISTINCT FROM $3
          AND c.kind = $4
        "#
    ))
    .bind(a)
    .bind(b)
    .bind(listing_id)
    .bind(kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(conversation)
}

/// Append a SYSTEM message and move `last_message_at` to it.
pub(crate) async fn post_system_message(
    conn: &mut PgConnection,
    conversation_id: i64,
    content: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO messages (conversation_id, sender_id, kind, content, created_at)
        VALUES ($1, NULL, $2, $3, $4)
        "#,
    )
    .bind(conversation_id)
    .bind(MessageKind::System.as_str())
    .bind(content)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2)
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Conversation repository
pub struct ConversationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Start a conversation, or return the one that already exists.
    pub async fn create_or_get(
        &self,
        initiator_id: i64,
        participant_id: i64,
        listing_id: Option<i64>,
        kind: ConversationKind,
    ) -> Result<Conversation, DbError> {
        let mut conn = self.pool.acquire().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(participant_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists {
            return Err(DbError::not_found("user", participant_id));
        }

        ensure_conversation(&mut conn, initiator_id, participant_id, listing_id, kind).await
    }

    /// Fetch a conversation the caller takes part in.
    pub async fn get_for_party(&self, id: i64, caller: Caller) -> Result<Conversation, DbError> {
        let conversation: Conversation = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("conversation", id))?;

        if !conversation.includes(caller.user_id) && !caller.is_admin {
            return Err(DbError::not_found("conversation", id));
        }
        Ok(conversation)
    }

    /// Inbox for a user, most recently active first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<ConversationSummary>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.kind, c.listing_id, c.last_message_at,
                   l.name AS listing_name,
                   u.id AS other_user_id, u.username AS other_username,
                   m.content AS last_message,
                   COUNT(*) OVER() AS total
            FROM conversations c
            JOIN users u
              ON u.id = CASE WHEN c.initiator_id = $1 THEN c.participant_id ELSE c.initiator_id END
            LEFT JOIN listings l ON l.id = c.listing_id
            LEFT JOIN LATERAL (
                SELECT content FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) m ON TRUE
            WHERE c.initiator_id = $1 OR c.participant_id = $1
            ORDER BY c.last_message_at DESC NULLS LAST, c.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .into_iter()
            .map(|r| {
                let kind: String = r.get("kind");
                Ok(ConversationSummary {
                    id: r.get("id"),
                    kind: ConversationKind::try_from(kind)?,
                    listing_id: r.get("listing_id"),
                    listing_name: r.get("listing_name"),
                    other_user_id: r.get("other_user_id"),
                    other_username: r.get("other_username"),
                    last_message: r.get("last_message"),
                    last_message_at: r.get("last_message_at"),
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(page.wrap(items, total))
    }
}
