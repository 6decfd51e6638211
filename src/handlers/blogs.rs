//! Blog HTTP handlers.
//!
//! Public reads:
//! - GET /api/blogs - All blogs ordered by title
//! - GET /api/blogs/page?page=&page_size= - One page of the same list
//! - GET /api/blogs/{slug} - One blog by slug
//!
//! Admin (behind the bearer-token gate):
//! - GET /admin/blogs/{id} - One blog by id
//! - POST /admin/blogs/save - Create (id 0) or edit a blog
//! - POST /admin/blogs/delete - Delete a blog and its category links

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::blog::{Blog, BlogRequest, IdRequest, PageQuery},
    state::AppState,
};

pub async fn all_blogs(State(state): State<AppState>) -> Result<Json<Vec<Blog>>, AppError> {
    Ok(Json(state.blogs().get_all().await?))
}

/// # Errors
///
/// - `InvalidRequest` (400): `page < 1` or `page_size` outside 1..=100
pub async fn blogs_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Blog>>, AppError> {
    Ok(Json(
        state
            .blogs()
            .get_all_paginated(query.page, query.page_size)
            .await?,
    ))
}

pub async fn one_blog(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Blog>, AppError> {
    Ok(Json(state.blogs().get_one_by_slug(&slug).await?))
}

pub async fn blog_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Blog>, AppError> {
    Ok(Json(state.blogs().get_one_by_id(id).await?))
}

/// Create or edit a blog.
///
/// New blogs are authored by the authenticated user. Edits keep the original
/// author. The saved blog is read back and returned with its categories.
///
/// # Errors
///
/// - `InvalidRequest` (400): empty title or unknown category ids
/// - `NotFound` (404): editing an unknown id
/// - `Conflict` (409): slug already used by another blog
/// - `CategoryWrite` (500): category links failed; nothing was saved
pub async fn save_blog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BlogRequest>,
) -> Result<Json<Blog>, AppError> {
    let blogs = state.blogs();

    let id = if request.id == 0 {
        let id = blogs.create(auth.user_id, &request).await?;
        tracing::info!(blog_id = id, user_id = auth.user_id, "Blog created");
        id
    } else {
        blogs.update(request.id, &request).await?;
        tracing::info!(blog_id = request.id, user_id = auth.user_id, "Blog updated");
        request.id
    };

    Ok(Json(blogs.get_one_by_id(id).await?))
}

pub async fn delete_blog(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<IdRequest>,
) -> Result<StatusCode, AppError> {
    state.blogs().delete_by_id(request.id).await?;
    tracing::info!(blog_id = request.id, user_id = auth.user_id, "Blog deleted");

    Ok(StatusCode::NO_CONTENT)
}
