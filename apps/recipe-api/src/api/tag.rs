//! Tag API endpoints.

use std::sync::Arc;

use api_protocol::{TagRequest, TagResponse};
use axum::{Extension, Json, extract::State, http::StatusCode};
use recipe_store::{Store, StoreError};

use crate::{
    api::extract::{Payload, ResourceId},
    error::{ServerError, ServerResult},
    middleware::AuthenticatedUser,
    state::AppState,
};

fn duplicate_name(e: StoreError) -> ServerError {
    match e {
        StoreError::AlreadyExists { .. } => {
            ServerError::field("name", "You already have a tag with this name.")
        }
        e => e.into(),
    }
}

/// Lists the caller's tags, newest first.
pub async fn list_tags<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ServerResult<Json<Vec<TagResponse>>> {
    let tags = state.store.list_tags(caller.id()).await?;

    Ok(Json(tags.iter().map(TagResponse::from).collect()))
}

/// Creates a tag owned by the caller.
pub async fn create_tag<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Payload(request): Payload<TagRequest>,
) -> ServerResult<(StatusCode, Json<TagResponse>)> {
    let name = request.into_name().map_err(ServerError::Validation)?;
    let tag = state
        .store
        .create_tag(caller.id(), &name)
        .await
        .map_err(duplicate_name)?;

    tracing::info!(user_id = %caller.id(), tag_id = %tag.id, "Tag created");

    Ok((StatusCode::CREATED, Json(TagResponse::from(&tag))))
}

/// Renames one of the caller's tags. Serves both `PATCH` and `PUT`.
///
/// An unknown or foreign tag is a 404 even when the body is also invalid.
pub async fn update_tag<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
    Payload(request): Payload<TagRequest>,
) -> ServerResult<Json<TagResponse>> {
    state
        .store
        .get_tag(caller.id(), id)
        .await?
        .ok_or(ServerError::NotFound)?;
    let name = request.into_name().map_err(ServerError::Validation)?;
    let tag = state
        .store
        .update_tag(caller.id(), id, &name)
        .await
        .map_err(duplicate_name)?;

    tracing::info!(user_id = %caller.id(), tag_id = %id, "Tag renamed");

    Ok(Json(TagResponse::from(&tag)))
}

/// Deletes one of the caller's tags and detaches it from recipes.
pub async fn delete_tag<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ResourceId(id): ResourceId,
) -> ServerResult<StatusCode> {
    state.store.delete_tag(caller.id(), id).await?;

    tracing::info!(user_id = %caller.id(), tag_id = %id, "Tag deleted");

    Ok(StatusCode::NO_CONTENT)
}
