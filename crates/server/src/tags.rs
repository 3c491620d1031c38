//! Tag API endpoints.

use api_types::tag::{Tag, TagNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub(crate) fn to_api(tag: engine::Tag) -> Tag {
    Tag {
        id: tag.id,
        name: tag.name,
        color: tag.color,
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Tag>>, ServerError> {
    let tags = state.engine.list_tags(&user.username).await?;
    Ok(Json(tags.into_iter().map(to_api).collect()))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TagNew>,
) -> Result<(StatusCode, Json<Tag>), ServerError> {
    let tag = state
        .engine
        .create_tag(&user.username, &payload.name, &payload.color)
        .await?;
    Ok((StatusCode::CREATED, Json(to_api(tag))))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_tag(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
