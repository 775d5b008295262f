use axum::{extract::State, response::IntoResponse, Json};

use crate::error::Result;
use crate::AppState;

pub async fn list_application_records(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let records = state.application_service.all_records().await?;
    Ok(Json(records))
}
