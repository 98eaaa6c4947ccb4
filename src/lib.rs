pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod metrics;
pub mod models;
pub mod object_store;
pub mod retry;
pub mod storage;
