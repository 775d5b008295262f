pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    application_service::ApplicationService,
    chat_service::{ChatHub, ChatService},
    job_service::JobService,
    user_service::UserService,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub application_service: ApplicationService,
    pub chat_service: ChatService,
    pub job_service: JobService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let config = crate::config::get_config();
        let hub = ChatHub::new(config.chat_channel_capacity);

        let application_service = ApplicationService::new(pool.clone());
        let chat_service = ChatService::new(pool.clone(), hub);
        let job_service = JobService::new(pool.clone());
        let user_service = UserService::new(pool.clone());

        Self {
            pool,
            application_service,
            chat_service,
            job_service,
            user_service,
        }
    }
}
