pub mod application_service;
pub mod chat_service;
pub mod job_service;
pub mod status_engine;
pub mod user_service;
