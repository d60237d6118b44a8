//! Maktaba — University Library Server
//!
//! A Rust REST server for a university library: borrow-request lifecycle,
//! bilingual (English/Arabic) catalog descriptions with lazy machine
//! translation, and admin dashboard rollups.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod lang;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
