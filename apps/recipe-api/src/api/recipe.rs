//! Recipe API endpoints.
//!
//! Every query is scoped to the caller; another user's recipe is reported as
//! not found.

use std::sync::Arc;

use api_protocol::{RecipeDetail, RecipeRequest, RecipeSummary};
use axum::{Extension, Json, extract::State, http::StatusCode};
use recipe_store::Store;

use crate::{
    api::extract::{Payload, ResourceId},
    error::{ServerError, ServerResult},
    middleware::AuthenticatedUser,
    state::AppState,
};

/// Resolves ownership before body validation, so an unknown recipe is a 404
/// even when the body is also invalid.
async fn ensure_owned<S: Store>(state: &AppState<S>, owner: i64, id: i64) -> ServerResult<()> {
    match state.store.get_recipe(owner, id).await? {
        Some(_) => Ok(()),
        None => Err(ServerError::NotFound),
    }
}

/// Lists the caller's recipes, newest first.
pub async fn list_recipes<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ServerResult<Json<Vec<RecipeSummary>>> {
    let recipes = state.store.list_recipes(caller.id()).await?;

    Ok(Json(recipes.iter().map(RecipeSummary::from).collect()))
}

/// Creates a recipe owned by the caller.
pub async fn create_recipe<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Payload(request): Payload<RecipeRequest>,
) -> ServerResult<(StatusCode, Json<RecipeDetail>)> {
    let fields = request.into_fields().map_err(ServerError::Validation)?;
    let recipe = state.store.create_recipe(caller.id(), fields).await?;

    tracing::info!(
        user_id = %caller.id(),
        recipe_id = %recipe.id,
        tags = recipe.tags.len(),
        "Recipe created"
    );

    Ok((StatusCode::CREATED, Json(RecipeDetail::from(&recipe))))
}

/// Gets one of the caller's recipes.
pub async fn get_recipe<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
) -> ServerResult<Json<RecipeDetail>> {
    let recipe = state
        .store
        .get_recipe(caller.id(), id)
        .await?
        .ok_or(ServerError::NotFound)?;

    Ok(Json(RecipeDetail::from(&recipe)))
}

/// Partially updates one of the caller's recipes.
pub async fn update_recipe<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
    Payload(request): Payload<RecipeRequest>,
) -> ServerResult<Json<RecipeDetail>> {
    ensure_owned(&state, caller.id(), id).await?;
    let changes = request.into_changes().map_err(ServerError::Validation)?;
    let recipe = state.store.update_recipe(caller.id(), id, changes).await?;

    tracing::info!(user_id = %caller.id(), recipe_id = %id, "Recipe updated");

    Ok(Json(RecipeDetail::from(&recipe)))
}

/// Replaces the core fields of one of the caller's recipes.
pub async fn replace_recipe<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
    Payload(request): Payload<RecipeRequest>,
) -> ServerResult<Json<RecipeDetail>> {
    ensure_owned(&state, caller.id(), id).await?;
    let fields = request.into_fields().map_err(ServerError::Validation)?;
    let recipe = state.store.replace_recipe(caller.id(), id, fields).await?;

    tracing::info!(user_id = %caller.id(), recipe_id = %id, "Recipe replaced");

    Ok(Json(RecipeDetail::from(&recipe)))
}

/// Deletes one of the caller's recipes.
pub async fn delete_recipe<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
) -> ServerResult<StatusCode> {
    state.store.delete_recipe(caller.id(), id).await?;

    tracing::info!(user_id = %caller.id(), recipe_id = %id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}
