use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use rollbook_shared::chat::ChatMessage;
use rollbook_shared::code::ShareCode;
use rollbook_shared::constants::MAX_ATTACHMENT_SIZE;
use rollbook_shared::snapshot::ClassSnapshot;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::registry::ShareStore;

#[derive(Clone)]
pub struct AppState {
    pub shares: Arc<ShareStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/share", post(publish))
        .route("/api/view", get(view))
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/delete", post(delete_message))
        .route("/api/lock", post(toggle_lock))
        .layer(DefaultBodyLimit::max(state.config.max_snapshot_size))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ShareResponse {
    code: ShareCode,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ViewParams {
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    code: String,
    message: ChatMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteMessageRequest {
    code: String,
    message_id: String,
    sender_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleLockRequest {
    code: String,
    is_locked: bool,
    sender_id: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Store a snapshot under a fresh code.
async fn publish(
    State(state): State<AppState>,
    Json(snapshot): Json<ClassSnapshot>,
) -> Result<Json<ShareResponse>, ServerError> {
    let code = state.shares.publish(snapshot).await?;
    Ok(Json(ShareResponse { code }))
}

/// Resolve a code to its stored snapshot (viewer join + every poll tick).
async fn view(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ClassSnapshot>, ServerError> {
    let raw = params
        .code
        .ok_or_else(|| ServerError::BadRequest("Code is required".to_string()))?;
    let code = parse_code(&raw)?;

    let snapshot = state.shares.fetch(&code).await?;
    Ok(Json(snapshot))
}

/// Append one chat message.  When the chat is locked only the teacher may
/// post; the client-side pre-check mirrors this rule but the check here is
/// the authoritative one.
async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let code = parse_code(&req.code)?;
    let message = req.message;

    if message.id.trim().is_empty() {
        return Err(ServerError::BadRequest("Message id is required".to_string()));
    }
    if let Some(ref url) = message.file_url {
        if url.len() > MAX_ATTACHMENT_SIZE {
            return Err(ServerError::BadRequest(format!(
                "Attachment too large: {} bytes (max {})",
                url.len(),
                MAX_ATTACHMENT_SIZE
            )));
        }
    }

    let sender = message.sender_id.clone();
    state
        .shares
        .update(&code, move |snapshot| {
            if snapshot.class.is_chat_locked && !message.sender_id.is_teacher() {
                return Err(ServerError::Forbidden(
                    "Chat is locked by teacher".to_string(),
                ));
            }
            snapshot.class.messages.push(message);
            Ok(())
        })
        .await?;

    info!(code = %code, sender = %sender, "message appended");
    Ok(Json(SuccessResponse { success: true }))
}

/// Remove one message by id.  Allowed for the teacher and for the original
/// sender; everyone else gets a 403.
async fn delete_message(
    State(state): State<AppState>,
    Json(req): Json<DeleteMessageRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let code = parse_code(&req.code)?;

    state
        .shares
        .update(&code, |snapshot| {
            let Some(message) = snapshot.class.messages.iter().find(|m| m.id == req.message_id)
            else {
                return Err(ServerError::NotFound("Message not found".to_string()));
            };

            let is_teacher = req.sender_id == "teacher";
            if !is_teacher && message.sender_id.as_str() != req.sender_id {
                return Err(ServerError::Forbidden(
                    "Only the teacher or the sender may delete a message".to_string(),
                ));
            }

            snapshot.class.messages.retain(|m| m.id != req.message_id);
            Ok(())
        })
        .await?;

    info!(code = %code, message = %req.message_id, "message deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// Flip the chat lock.  Teacher only.
async fn toggle_lock(
    State(state): State<AppState>,
    Json(req): Json<ToggleLockRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let code = parse_code(&req.code)?;

    if req.sender_id != "teacher" {
        return Err(ServerError::Forbidden(
            "Only the teacher may lock or unlock the chat".to_string(),
        ));
    }

    state
        .shares
        .update(&code, |snapshot| {
            snapshot.class.is_chat_locked = req.is_locked;
            Ok(())
        })
        .await?;

    info!(code = %code, locked = req.is_locked, "chat lock toggled");
    Ok(Json(SuccessResponse { success: true }))
}

/// A code that does not even fit the alphabet cannot name an entry, so the
/// caller sees the same "Code not found" as for an unknown code.
fn parse_code(raw: &str) -> Result<ShareCode, ServerError> {
    ShareCode::parse(raw).map_err(|_| ServerError::NotFound("Code not found".to_string()))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
