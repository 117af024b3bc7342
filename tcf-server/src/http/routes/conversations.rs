//! Conversation and message endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tcf_core::{
    ConversationKind, MessageBody, MessageKind, Paginated, Pagination, PaginationParams,
    ValidationError,
};

use crate::db::{
    Conversation, ConversationRepo, ConversationSummary, ListingRepo, Message, MessageRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, IdPath, JsonBody, QueryParams};
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    /// Defaults to the listing's seller, or the support account for SUPPORT
    pub participant_id: Option<i64>,
    pub listing_id: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: i64,
    pub initiator_id: i64,
    pub participant_id: i64,
    /// The participant who is not the caller
    pub other_user_id: i64,
    pub listing_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConversationResponse {
    fn new(c: Conversation, viewer_id: i64) -> Self {
        Self {
            id: c.id,
            other_user_id: c.other(viewer_id),
            initiator_id: c.initiator_id,
            participant_id: c.participant_id,
            listing_id: c.listing_id,
            kind: c.kind,
            last_message_at: c.last_message_at,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            kind: m.kind,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ThreadResponse {
    pub conversation: ConversationResponse,
    pub messages: Paginated<MessageResponse>,
}

/// GET /api/conversations - inbox, most recent first
async fn list_conversations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    QueryParams(params): QueryParams<PaginationParams>,
) -> Result<Json<Paginated<ConversationSummary>>, ApiError> {
    let result = ConversationRepo::new(&state.pool)
        .list_for_user(user.id, Pagination::from(params))
        .await?;
    Ok(Json(result))
}

/// POST /api/conversations - start or reopen a conversation
async fn create_conversation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), ApiError> {
    let kind = match req.kind.as_deref() {
        Some(kind) => kind.parse()?,
        None if req.listing_id.is_some() => ConversationKind::Order,
        None => ConversationKind::General,
    };

    let participant_id = match (kind, req.participant_id, req.listing_id) {
        (ConversationKind::Support, _, _) => {
            state.config.support_user_id.ok_or_else(|| ApiError::Internal {
                message: "SUPPORT_USER_ID is not configured".into(),
            })?
        }
        (_, Some(participant), _) => participant,
        (_, None, Some(listing_id)) => {
            ListingRepo::new(&state.pool).get(listing_id).await?.seller_id
        }
        (_, None, None) => {
            return Err(ValidationError::Empty {
                field: "participant_id",
            }
            .into())
        }
    };

    let conversation = ConversationRepo::new(&state.pool)
        .create_or_get(user.id, participant_id, req.listing_id, kind)
        .await?;
    Ok((StatusCode::CREATED, Json(ConversationResponse::new(conversation, user.id))))
}

/// GET /api/messages/{conversation_id} - a conversation and its messages
async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(conversation_id): IdPath,
    QueryParams(params): QueryParams<PaginationParams>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let conversation = ConversationRepo::new(&state.pool)
        .get_for_party(conversation_id, user.caller())
        .await?;
    let messages = MessageRepo::new(&state.pool)
        .list_for_conversation(conversation.id, Pagination::from(params))
        .await?;

    Ok(Json(ThreadResponse {
        conversation: ConversationResponse::new(conversation, user.id),
        messages: messages.map(MessageResponse::from),
    }))
}

/// POST /api/messages/{conversation_id} - send a message
async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(conversation_id): IdPath,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let kind = match req.kind.as_deref() {
        Some(kind) => kind.parse()?,
        None => MessageKind::Text,
    };
    let body = MessageBody::new(&req.content)?;

    let message = MessageRepo::new(&state.pool)
        .send(conversation_id, user.caller(), kind, body, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Conversation routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/messages/{conversation_id}",
            get(list_messages).post(send_message),
        )
}
