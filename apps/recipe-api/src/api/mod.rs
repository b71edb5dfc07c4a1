//! API endpoints.

pub mod extract;
pub mod recipe;
pub mod tag;
pub mod user;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use recipe_store::Store;

use crate::{middleware::auth_middleware, state::AppState};

/// Creates the API router with all endpoints.
///
/// Signup, login and the health check are public; everything else requires
/// a valid token.
pub fn create_router<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    let public = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Account endpoints
        .route("/user/", post(user::create_user::<S>))
        .route("/user/token/", post(user::create_token::<S>));

    let protected = Router::new()
        // Account endpoints
        .route("/user/", get(user::get_me).patch(user::update_me::<S>))
        .route("/user/token/", delete(user::revoke_token::<S>))
        // Recipe endpoints
        .route(
            "/recipe/",
            get(recipe::list_recipes::<S>).post(recipe::create_recipe::<S>),
        )
        .route(
            "/recipe/:id/",
            get(recipe::get_recipe::<S>)
                .patch(recipe::update_recipe::<S>)
                .put(recipe::replace_recipe::<S>)
                .delete(recipe::delete_recipe::<S>),
        )
        // Tag endpoints
        .route(
            "/recipe/tags/",
            get(tag::list_tags::<S>).post(tag::create_tag::<S>),
        )
        .route(
            "/recipe/tags/:id/",
            patch(tag::update_tag::<S>)
                .put(tag::update_tag::<S>)
                .delete(tag::delete_tag::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ));

    public.merge(protected).with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
