//! HTTP request handlers

use super::twiml;
use super::types::{ErrorResponse, MessageRequest, MessageResponse, WhatsAppWebhook};
use super::AppState;
use crate::replies;
use crate::runtime::InboundMessage;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Twilio WhatsApp webhook
        .route("/webhook/whatsapp", post(whatsapp_webhook))
        // Transport-neutral message endpoint
        .route("/api/messages", post(post_message))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Message Handling
// ============================================================

async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(form): Form<WhatsAppWebhook>,
) -> Result<Response, AppError> {
    let sender = form.sender();
    if sender.is_empty() {
        return Err(AppError::BadRequest("Missing sender".to_string()));
    }

    let message = InboundMessage {
        sender: sender.to_string(),
        text: form.body.clone(),
        display_name: form.profile_name.clone().filter(|n| !n.trim().is_empty()),
    };
    let reply = process_message(&state, message).await;

    Ok((
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        twiml::message_response(&reply),
    )
        .into_response())
}

async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.sender.trim().is_empty() {
        return Err(AppError::BadRequest("Missing sender".to_string()));
    }

    let message = InboundMessage {
        sender: req.sender.trim().to_string(),
        text: req.text,
        display_name: req.display_name,
    };
    let reply = process_message(&state, message).await;
    Ok(Json(MessageResponse { reply }))
}

/// Run one message to completion and always produce a reply.
///
/// Handling runs in its own task so a panic surfaces as a `JoinError` here
/// instead of tearing down the connection. The sender lock is taken inside
/// the task, so a dropped request cannot let a later message overtake it.
async fn process_message(state: &AppState, message: InboundMessage) -> String {
    let sender = message.sender.clone();
    let lock = state.sender_lock(&sender);
    let assistant = state.assistant.clone();

    let handle = tokio::spawn(async move {
        let _guard = lock.lock().await;
        assistant.handle_message(&message).await
    });

    match handle.await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::error!(sender = %sender, error = %e, "Failed to handle message");
            replies::GENERIC_ERROR.to_string()
        }
        Err(e) => {
            tracing::error!(sender = %sender, error = %e, "Message handler task failed");
            replies::GENERIC_ERROR.to_string()
        }
    }
}

// ============================================================
// Service Info
// ============================================================

async fn health() -> &'static str {
    "OK"
}

async fn get_version() -> &'static str {
    concat!("agenda-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
