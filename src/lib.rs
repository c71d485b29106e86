//! Ivy wallet sync engine
//!
//! Keeps the local SQLite copy of accounts, categories, transactions and
//! budgets in step with the Ivy backend.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod ivy_service;
pub mod log_appender;
pub mod models;
pub mod persistency;
pub mod scheduler;
pub mod sync;
