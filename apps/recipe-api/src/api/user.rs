//! User account API endpoints.

use std::sync::Arc;

use api_protocol::{
    CreateUserRequest, TokenRequest, TokenResponse, UpdateUserRequest, UserResponse,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use recipe_store::Store;

use crate::{
    api::extract::Payload,
    error::ServerResult,
    middleware::AuthenticatedUser,
    services::AccountService,
    state::AppState,
};

/// Registers a new user.
pub async fn create_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Payload(request): Payload<CreateUserRequest>,
) -> ServerResult<(StatusCode, Json<UserResponse>)> {
    let user = AccountService::new(&state.store, &state.jwt_manager)
        .create_user(request)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Returns the caller's profile.
pub async fn get_me(Extension(caller): Extension<AuthenticatedUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&caller.user))
}

/// Updates the caller's name and/or password.
pub async fn update_me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Payload(request): Payload<UpdateUserRequest>,
) -> ServerResult<Json<UserResponse>> {
    let user = AccountService::new(&state.store, &state.jwt_manager)
        .update_user(caller.user, request)
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// Exchanges email and password for a bearer token.
pub async fn create_token<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Payload(request): Payload<TokenRequest>,
) -> ServerResult<Json<TokenResponse>> {
    let token = AccountService::new(&state.store, &state.jwt_manager)
        .authenticate(request)
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// Revokes the presented token (logout).
pub async fn revoke_token<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ServerResult<StatusCode> {
    AccountService::new(&state.store, &state.jwt_manager)
        .revoke_token(caller.id(), &caller.claims)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
