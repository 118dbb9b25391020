pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod group;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::middleware::auth::{IdentityGuard, JwtGuard};

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub guard: Arc<dyn IdentityGuard>,
}

impl AppState {
    /// State with the JWT identity guard for `config.jwt_secret`
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let guard = Arc::new(JwtGuard::new(config.jwt_secret.clone()));
        Self { db, config, guard }
    }
}
