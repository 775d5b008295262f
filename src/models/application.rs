use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Closed status enumeration. The wire and storage form is the
/// snake_case name; there is no substring or case-folding interpretation
/// anywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    SeekerAccepted,
    ProviderAccepted,
    BothAccepted,
    Rejected,
}

impl ApplicationStatus {
    /// Terminal states admit no further status transition, only the
    /// per-actor hide flags.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::BothAccepted | ApplicationStatus::Rejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::SeekerAccepted => "seeker_accepted",
            ApplicationStatus::ProviderAccepted => "provider_accepted",
            ApplicationStatus::BothAccepted => "both_accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub seeker_id: Uuid,
    pub provider_id: Uuid,
    pub seeker_message: Option<String>,
    pub status: ApplicationStatus,
    pub seeker_hidden: bool,
    pub provider_hidden: bool,
    pub chat_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyRequest {
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

/// Seeker-side list row: one applied job with the provider's display
/// fields joined in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppliedJobRow {
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub job_type: String,
    pub salary: String,
    pub city: String,
    pub provider_name: String,
    pub status: ApplicationStatus,
    pub chat_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
}

/// Provider-side list row: one applicant for a job.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantRow {
    pub application_id: Uuid,
    pub seeker_id: Uuid,
    pub seeker_name: String,
    pub seeker_email: String,
    pub seeker_message: Option<String>,
    pub status: ApplicationStatus,
    pub chat_id: Option<Uuid>,
    pub applied_at: DateTime<Utc>,
}

/// Admin view over every application record, hidden flags ignored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub application_id: Uuid,
    pub job_title: String,
    pub seeker_name: String,
    pub provider_name: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}
