use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job::{CreateJobRequest, Job};
use crate::models::user::{AuthUser, Role};

#[derive(Clone)]
pub struct JobService {
    pool: SqlitePool,
}

impl JobService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_job(&self, actor: AuthUser, req: CreateJobRequest) -> Result<Job> {
        if actor.role != Role::Provider {
            return Err(Error::Forbidden("only providers can post jobs".to_string()));
        }

        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, provider_id, title, description, job_type, salary, city, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor.id)
        .bind(&req.title)
        .bind(req.description.unwrap_or_default())
        .bind(req.job_type.unwrap_or_default())
        .bind(req.salary.unwrap_or_default())
        .bind(req.city.unwrap_or_default())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(job_id = %job.id, provider_id = %actor.id, "job posted");
        Ok(job)
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    pub async fn list_for_provider(&self, actor: AuthUser) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE provider_id = ? ORDER BY created_at DESC",
        )
        .bind(actor.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    pub async fn delete_job(&self, actor: AuthUser, id: Uuid) -> Result<()> {
        let job = self.get_job(id).await?;
        if actor.role != Role::Provider || job.provider_id != actor.id {
            return Err(Error::Forbidden(
                "only the posting provider can delete a job".to_string(),
            ));
        }

        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(job_id = %id, "job deleted");
        Ok(())
    }
}
