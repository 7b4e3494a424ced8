//! Application state

use planner_shared::RateLimiter;
use sqlx::PgPool;

use crate::{
    auth::{AuthState, JwtManager},
    config::Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_ttl_seconds);
        tracing::info!(
            ttl_seconds = jwt_manager.ttl_seconds(),
            "Token manager initialized"
        );

        let rate_limiter = RateLimiter::new_in_memory();
        tracing::info!("Rate limiter initialized");

        Self {
            pool,
            config,
            jwt_manager,
            rate_limiter,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
