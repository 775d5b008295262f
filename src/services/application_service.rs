use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{
    ApplicantRow, Application, ApplicationRecord, ApplicationStatus, AppliedJobRow,
};
use crate::models::job::Job;
use crate::models::user::{AuthUser, Role};
use crate::services::status_engine::{self, ApplicationAction, Transition};

#[derive(Clone)]
pub struct ApplicationService {
    pool: SqlitePool,
}

impl ApplicationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        let app = sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        Ok(app)
    }

    pub async fn apply(
        &self,
        actor: AuthUser,
        job_id: Uuid,
        message: Option<String>,
    ) -> Result<Application> {
        if actor.role != Role::Seeker {
            return Err(Error::Forbidden(
                "only seekers can apply for jobs".to_string(),
            ));
        }

        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if job.provider_id == actor.id {
            return Err(Error::BadRequest(
                "you cannot apply for your own job".to_string(),
            ));
        }

        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM applications WHERE job_id = ? AND seeker_id = ?")
                .bind(job_id)
                .bind(actor.id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_some() {
            return Err(Error::AlreadyApplied);
        }

        let result = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (id, job_id, seeker_id, provider_id, seeker_message, status, applied_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(actor.id)
        .bind(job.provider_id)
        .bind(&message)
        .bind(ApplicationStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(app) => {
                tracing::info!(application_id = %app.id, job_id = %job_id, "new application");
                Ok(app)
            }
            // Identical applies racing past the pre-check hit the
            // unique index on (job_id, seeker_id).
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::AlreadyApplied)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn seeker_accept(&self, actor: AuthUser, id: Uuid) -> Result<Application> {
        self.act(actor, id, ApplicationAction::SeekerAccept).await
    }

    pub async fn provider_accept(&self, actor: AuthUser, id: Uuid) -> Result<Application> {
        self.act(actor, id, ApplicationAction::ProviderAccept).await
    }

    pub async fn provider_reject(&self, actor: AuthUser, id: Uuid) -> Result<Application> {
        self.act(actor, id, ApplicationAction::ProviderReject).await
    }

    /// Hard-removes a not-yet-finished application. Terminal records are
    /// refused by the engine and survive for the other party's history.
    pub async fn withdraw(&self, actor: AuthUser, id: Uuid) -> Result<()> {
        let app = self.get(id).await?;
        check_ownership(&app, actor)?;

        match status_engine::transition(app.status, actor.role, ApplicationAction::Withdraw)? {
            Transition::Delete => {
                let affected = sqlx::query("DELETE FROM applications WHERE id = ? AND status = ?")
                    .bind(id)
                    .bind(app.status)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
                if affected == 0 {
                    return Err(Error::ConcurrentModification);
                }
                tracing::info!(application_id = %id, "application withdrawn");
                Ok(())
            }
            _ => Err(Error::Internal(
                "withdraw resolved to a non-delete outcome".to_string(),
            )),
        }
    }

    /// Sets the acting role's hidden flag and nothing else. Idempotent:
    /// hiding an already-hidden application is a no-op.
    pub async fn hide(&self, actor: AuthUser, id: Uuid) -> Result<Application> {
        let app = self.get(id).await?;
        check_ownership(&app, actor)?;

        let action = match actor.role {
            Role::Seeker => ApplicationAction::SeekerHide,
            Role::Provider => ApplicationAction::ProviderHide,
            Role::Admin => {
                return Err(Error::Forbidden(
                    "admins do not take part in applications".to_string(),
                ))
            }
        };

        let already_hidden = match actor.role {
            Role::Seeker => app.seeker_hidden,
            _ => app.provider_hidden,
        };
        if already_hidden {
            return Ok(app);
        }

        match status_engine::transition(app.status, actor.role, action)? {
            Transition::Hide(Role::Seeker) => {
                sqlx::query("UPDATE applications SET seeker_hidden = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            Transition::Hide(Role::Provider) => {
                sqlx::query("UPDATE applications SET provider_hidden = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            _ => {
                return Err(Error::Internal(
                    "hide resolved to a non-hide outcome".to_string(),
                ))
            }
        }

        self.get(id).await
    }

    /// Applied-jobs view for a seeker, with rows the seeker has removed
    /// filtered out. The provider's copy of the same record is untouched.
    pub async fn visible_for_seeker(&self, actor: AuthUser) -> Result<Vec<AppliedJobRow>> {
        if actor.role != Role::Seeker {
            return Err(Error::Forbidden("seeker listing only".to_string()));
        }

        let rows = sqlx::query_as::<_, AppliedJobRow>(
            r#"
            SELECT a.id AS application_id, a.job_id, j.title, j.job_type, j.salary, j.city,
                   u.name AS provider_name, a.status, a.chat_id, a.applied_at
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users u ON u.id = a.provider_id
            WHERE a.seeker_id = ? AND a.seeker_hidden = 0
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(actor.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Applicant list for one of the provider's jobs, minus applicants
    /// the provider has removed from their view.
    pub async fn applicants_for_job(&self, actor: AuthUser, job_id: Uuid) -> Result<Vec<ApplicantRow>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if actor.role != Role::Provider || job.provider_id != actor.id {
            return Err(Error::Forbidden(
                "only the posting provider can list applicants".to_string(),
            ));
        }

        let rows = sqlx::query_as::<_, ApplicantRow>(
            r#"
            SELECT a.id AS application_id, a.seeker_id, u.name AS seeker_name,
                   u.email AS seeker_email, a.seeker_message, a.status, a.chat_id, a.applied_at
            FROM applications a
            JOIN users u ON u.id = a.seeker_id
            WHERE a.job_id = ? AND a.provider_hidden = 0
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every application record, hidden flags ignored.
    pub async fn all_records(&self) -> Result<Vec<ApplicationRecord>> {
        let rows = sqlx::query_as::<_, ApplicationRecord>(
            r#"
            SELECT a.id AS application_id, j.title AS job_title,
                   s.name AS seeker_name, p.name AS provider_name, a.status, a.applied_at
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users s ON s.id = a.seeker_id
            JOIN users p ON p.id = a.provider_id
            ORDER BY a.applied_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Shared accept/reject path: compute the transition from the
    /// observed status, then apply it with a compare-and-set on that
    /// same observed status. Losing the race changes nothing and
    /// surfaces `ConcurrentModification` for the caller to re-fetch.
    async fn act(&self, actor: AuthUser, id: Uuid, action: ApplicationAction) -> Result<Application> {
        let app = self.get(id).await?;
        check_ownership(&app, actor)?;

        match status_engine::transition(app.status, actor.role, action)? {
            Transition::Move { next, unlocks_chat } => {
                let affected = if unlocks_chat {
                    // Channel id assignment rides the same statement
                    // as the status flip.
                    sqlx::query(
                        r#"
                        UPDATE applications SET status = ?, chat_id = ?
                        WHERE id = ? AND status = ? AND chat_id IS NULL
                        "#,
                    )
                    .bind(next)
                    .bind(Uuid::new_v4())
                    .bind(id)
                    .bind(app.status)
                    .execute(&self.pool)
                    .await?
                    .rows_affected()
                } else {
                    sqlx::query("UPDATE applications SET status = ? WHERE id = ? AND status = ?")
                        .bind(next)
                        .bind(id)
                        .bind(app.status)
                        .execute(&self.pool)
                        .await?
                        .rows_affected()
                };

                if affected == 0 {
                    return Err(Error::ConcurrentModification);
                }

                let updated = self.get(id).await?;
                tracing::info!(
                    application_id = %id,
                    from = app.status.as_str(),
                    to = updated.status.as_str(),
                    action = action.as_str(),
                    "application transition"
                );
                Ok(updated)
            }
            _ => Err(Error::Internal(
                "accept/reject resolved to a non-move outcome".to_string(),
            )),
        }
    }
}

/// The acting user must be the seeker or provider the record names;
/// admins manage lists elsewhere and never drive transitions.
fn check_ownership(app: &Application, actor: AuthUser) -> Result<()> {
    let owns = match actor.role {
        Role::Seeker => app.seeker_id == actor.id,
        Role::Provider => app.provider_id == actor.id,
        Role::Admin => false,
    };
    if owns {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "you are not a party to this application".to_string(),
        ))
    }
}
