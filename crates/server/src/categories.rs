//! Category API endpoints.

use api_types::category::{Category, CategoryNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub(crate) fn to_api(category: engine::Category) -> Category {
    Category {
        id: category.id,
        name: category.name,
        icon: category.icon,
        color: category.color,
        sort_order: category.sort_order,
        is_default: category.is_default,
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Category>>, ServerError> {
    let categories = state.engine.list_categories(&user.username).await?;
    Ok(Json(categories.into_iter().map(to_api).collect()))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<Category>), ServerError> {
    let category = state
        .engine
        .create_category(&user.username, &payload.name, &payload.icon, &payload.color)
        .await?;
    Ok((StatusCode::CREATED, Json(to_api(category))))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
