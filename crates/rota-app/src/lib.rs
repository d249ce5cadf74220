pub mod app;
pub mod config;
pub mod error;
pub mod scheduler_handler;
