use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::models::job::CreateJobRequest;
use crate::models::user::AuthUser;
use crate::AppState;

pub async fn create_job(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateJobRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.create_job(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_provider_jobs(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list_for_provider(actor).await?;
    Ok(Json(jobs))
}

pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list_jobs().await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_job(id).await?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.job_service.delete_job(actor, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
