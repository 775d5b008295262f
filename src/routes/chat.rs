use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::models::chat::SendMessageRequest;
use crate::models::user::AuthUser;
use crate::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(channel_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let message = state
        .chat_service
        .publish(actor, channel_id, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state.chat_service.history(actor, channel_id).await?;
    Ok(Json(messages))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let unread = state.chat_service.unread_count(actor, channel_id).await?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.chat_service.mark_read(actor, channel_id).await?;
    Ok(Json(serde_json::json!({ "unread": 0 })))
}

pub async fn get_partner(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let name = state.chat_service.partner_name(actor, channel_id).await?;
    Ok(Json(serde_json::json!({ "name": name })))
}
