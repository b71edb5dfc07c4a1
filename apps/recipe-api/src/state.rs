//! Application state.

use std::sync::Arc;

use auth::JwtManager;
use recipe_store::Store;

use crate::config::Config;

/// Shared application state.
pub struct AppState<S: Store> {
    /// Server configuration.
    pub config: Config,
    /// Account, tag and recipe store.
    pub store: S,
    /// Issues and validates bearer tokens.
    pub jwt_manager: JwtManager,
}

impl<S: Store> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, jwt_manager: JwtManager) -> Self {
        Self {
            config,
            store,
            jwt_manager,
        }
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;

/// Creates shared state from config, store and token manager.
pub fn create_shared_state<S: Store>(
    config: Config,
    store: S,
    jwt_manager: JwtManager,
) -> SharedState<S> {
    Arc::new(AppState::new(config, store, jwt_manager))
}
