//! Business logic services

pub mod auth;
pub mod books;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::BookStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BookService,
}

impl Services {
    /// Create all services around the selected store
    pub fn new(store: Arc<dyn BookStore>, auth_config: AuthConfig) -> Self {
        Self {
            auth: auth::AuthService::new(auth_config),
            books: books::BookService::new(store),
        }
    }
}
