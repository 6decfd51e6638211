//! Category HTTP handlers.
//!
//! - GET /api/categories - List categories by name
//! - GET /api/categories/{id} - One category
//! - POST /admin/categories/save - Create a category

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::category::{Category, CategoryRequest},
    state::AppState,
};

pub async fn all_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.categories().get_all().await?))
}

pub async fn one_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, AppError> {
    Ok(Json(state.categories().get_by_id(id).await?))
}

/// Create a category.
///
/// # Response
///
/// - **Success (201 Created)**: the stored category
/// - **Error (400)**: blank `category_name`
pub async fn save_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.categories().create(&request).await?;

    Ok((StatusCode::CREATED, Json(category)))
}
