pub mod admin;
pub mod application;
pub mod chat;
pub mod health;
pub mod job;
pub mod user;
