//! Bookshelf Library Catalog
//!
//! A small catalog service tracking books and their available copies, with
//! interchangeable storage backends (in-memory, JSON file, SQLite) behind a
//! single store trait and a REST JSON API on top.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
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

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn repository::BookStore>) -> Self {
        let services = services::Services::new(store, config.auth.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
