use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{ConversationAccess, MessagesQuery, MessagesResponse, SendMessageRequest, TypingRequest};
use crate::services::ServerEvent;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/conversations", web::get().to(list_conversations))
        .route("/conversations/{id}/messages", web::get().to(list_messages))
        .route("/conversations/{id}/messages", web::post().to(send_message))
        .route("/conversations/{id}/read", web::post().to(mark_read))
        .route("/conversations/{id}/typing", web::post().to(typing));
}

async fn access_for(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<ConversationAccess, ApiError> {
    let access = state
        .db
        .conversation_access(conversation_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation"))?;

    if !access.can_read() {
        return Err(ApiError::Forbidden("Not a participant of this conversation".to_string()));
    }
    Ok(access)
}

fn require_post(access: &ConversationAccess) -> Result<(), ApiError> {
    if access.can_post() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("This conversation is closed".to_string()))
    }
}

/// Broadcast a typing indicator to the other participants.
///
/// Shared by the REST endpoint and the socket.
pub(crate) async fn relay_typing(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
    is_typing: bool,
) -> Result<usize, ApiError> {
    let access = access_for(state, conversation_id, user_id).await?;
    require_post(&access)?;

    let recipients: Vec<Uuid> = state
        .db
        .conversation_participants(conversation_id)
        .await?
        .into_iter()
        .filter(|id| *id != user_id)
        .collect();

    let event = ServerEvent::Typing {
        conversation_id,
        user_id,
        is_typing,
    };
    Ok(state.hub.publish_many(&recipients, &event))
}

async fn list_conversations(state: web::Data<AppState>, auth: AuthUser) -> Result<HttpResponse, ApiError> {
    let conversations = state.db.list_conversations(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// GET /api/v1/conversations/{id}/messages?before=...&beforeId=...&limit=50
async fn list_messages(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let conversation_id = path.into_inner();
    access_for(&state, conversation_id, auth.user_id).await?;

    let limit = state.page_limit(query.limit) as i64;
    let (messages, has_more) = state
        .db
        .list_messages(conversation_id, query.before, query.before_id, limit)
        .await?;

    Ok(HttpResponse::Ok().json(MessagesResponse { messages, has_more }))
}

/// Persist a message, then push it to every participant's open sockets
async fn send_message(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let conversation_id = path.into_inner();

    let access = access_for(&state, conversation_id, auth.user_id).await?;
    require_post(&access)?;

    let message = state.db.send_message(conversation_id, auth.user_id, &req.body).await?;

    let participants = state.db.conversation_participants(conversation_id).await?;
    let delivered = state.hub.publish_many(
        &participants,
        &ServerEvent::Message {
            message: message.clone(),
        },
    );

    tracing::debug!(
        "Message {} in {} delivered to {} sockets",
        message.id,
        conversation_id,
        delivered
    );

    Ok(HttpResponse::Created().json(message))
}

async fn mark_read(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conversation_id = path.into_inner();
    access_for(&state, conversation_id, auth.user_id).await?;

    state.db.mark_read(conversation_id, auth.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn typing(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<TypingRequest>,
) -> Result<HttpResponse, ApiError> {
    relay_typing(&state, path.into_inner(), auth.user_id, req.is_typing).await?;
    Ok(HttpResponse::NoContent().finish())
}
