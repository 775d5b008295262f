use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::models::application::ApplyRequest;
use crate::models::user::{AuthUser, Role};
use crate::AppState;

pub async fn apply(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<ApplyRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let app = state
        .application_service
        .apply(actor, job_id, payload.message)
        .await?;
    Ok((StatusCode::CREATED, Json(app)))
}

pub async fn my_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let rows = state.application_service.visible_for_seeker(actor).await?;
    Ok(Json(rows))
}

pub async fn job_applicants(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state
        .application_service
        .applicants_for_job(actor, job_id)
        .await?;
    Ok(Json(rows))
}

pub async fn seeker_accept(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let app = state.application_service.seeker_accept(actor, id).await?;
    Ok(Json(app))
}

pub async fn provider_accept(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let app = state.application_service.provider_accept(actor, id).await?;
    Ok(Json(app))
}

pub async fn provider_reject(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let app = state.application_service.provider_reject(actor, id).await?;
    Ok(Json(app))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.withdraw(actor, id).await?;
    Ok(Json(serde_json::json!({ "withdrawn": id })))
}

pub async fn hide_for_seeker(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if actor.role != Role::Seeker {
        return Err(crate::error::Error::Forbidden(
            "seeker endpoint".to_string(),
        ));
    }
    let app = state.application_service.hide(actor, id).await?;
    Ok(Json(app))
}

pub async fn hide_for_provider(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if actor.role != Role::Provider {
        return Err(crate::error::Error::Forbidden(
            "provider endpoint".to_string(),
        ));
    }
    let app = state.application_service.hide(actor, id).await?;
    Ok(Json(app))
}

pub async fn ensure_channel(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let channel_id = state.chat_service.ensure_channel(actor, id).await?;
    Ok(Json(serde_json::json!({ "channel_id": channel_id })))
}
