use std::time::{Duration, Instant};

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message as WsMessage, MessageStream, Session};
use futures_util::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::conversations::relay_typing;
use crate::auth::AuthUser;
use crate::services::{ClientEvent, ServerEvent};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(connect));
}

/// Upgrade to a socket carrying this user's realtime events.
///
/// Browsers pass the token as `?token=`.
async fn connect(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
    auth: AuthUser,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, body)?;

    let events = state.hub.subscribe(auth.user_id);
    tracing::info!("Socket opened for {}", auth.user_id);

    actix_web::rt::spawn(run_session(
        state.get_ref().clone(),
        auth.user_id,
        session,
        msg_stream,
        events,
    ));

    Ok(response)
}

async fn run_session(
    state: AppState,
    user_id: Uuid,
    mut session: Session,
    mut msg_stream: MessageStream,
    mut events: broadcast::Receiver<ServerEvent>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut last_seen = Instant::now();

    let close_reason: Option<CloseReason> = loop {
        tokio::select! {
            frame = msg_stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    last_seen = Instant::now();
                    if let Some(reply) = handle_client_frame(&state, user_id, &text).await {
                        if send_event(&mut session, &reply).await.is_err() {
                            break None;
                        }
                    }
                }
                Some(Ok(WsMessage::Ping(bytes))) => {
                    last_seen = Instant::now();
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(WsMessage::Pong(_))) => last_seen = Instant::now(),
                Some(Ok(WsMessage::Close(reason))) => break reason,
                // Binary and continuation frames are not part of the protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Socket error for {}: {}", user_id, e);
                    break None;
                }
                None => break None,
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut session, &event).await.is_err() {
                        break None;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Socket for {} lagged, {} events dropped", user_id, skipped);
                }
                Err(RecvError::Closed) => break None,
            },
            _ = heartbeat.tick() => {
                if last_seen.elapsed() > CLIENT_TIMEOUT {
                    tracing::debug!("Socket for {} timed out", user_id);
                    break None;
                }
                if session.ping(b"").await.is_err() {
                    break None;
                }
            }
        }
    };

    drop(events);
    let _ = session.close(close_reason).await;
    state.hub.prune();

    tracing::info!("Socket closed for {}", user_id);
}

/// Act on a client frame; the return value is sent back to the same socket
async fn handle_client_frame(state: &AppState, user_id: Uuid, text: &str) -> Option<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            return Some(ServerEvent::Error {
                message: format!("Invalid frame: {}", e),
            })
        }
    };

    match event {
        ClientEvent::Ping => None,
        ClientEvent::Typing {
            conversation_id,
            is_typing,
        } => match relay_typing(state, conversation_id, user_id, is_typing).await {
            Ok(_) => None,
            Err(e) => Some(ServerEvent::Error {
                message: e.public_message(),
            }),
        },
    }
}

async fn send_event(session: &mut Session, event: &ServerEvent) -> Result<(), actix_ws::Closed> {
    match serde_json::to_string(event) {
        Ok(json) => session.text(json).await,
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
            Ok(())
        }
    }
}
