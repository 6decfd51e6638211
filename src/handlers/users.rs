//! Admin user management handlers.
//!
//! All routes here sit behind the bearer-token gate:
//! - GET /admin/users - List users
//! - GET /admin/users/{id} - Get one user
//! - POST /admin/users/save - Create (id 0) or edit a user
//! - POST /admin/users/delete - Delete a user and their tokens
//! - POST /admin/log-user-out/{id} - Deactivate a user and revoke their tokens

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::AppError,
    models::{
        blog::IdRequest,
        user::{UserRequest, UserResponse},
    },
    state::AppState,
};

pub async fn all_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users().get_all().await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.users().get_by_id(id).await?.into()))
}

/// Create or edit a user.
///
/// # Process
///
/// - `id == 0`: insert; a non-empty password is required
/// - otherwise: update email, names, active flag and (when non-empty) the
///   password in one write that also revokes tokens of an inactive user
///
/// # Errors
///
/// - `InvalidRequest` (400): new user without password
/// - `NotFound` (404): editing an unknown id
/// - `Conflict` (409): email already taken
pub async fn save_user(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let users = state.users();

    let id = if request.id == 0 {
        let id = users.insert(&request).await?;
        tracing::info!(user_id = id, "User created");
        id
    } else {
        let mut user = users.get_by_id(request.id).await?;
        user.email = request.email.clone();
        user.first_name = request.first_name.clone();
        user.last_name = request.last_name.clone();
        user.active = request.active;
        users.update(&user, request.new_password()).await?;
        tracing::info!(user_id = user.id, active = user.active, "User updated");

        user.id
    };

    Ok(Json(users.get_by_id(id).await?.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> Result<StatusCode, AppError> {
    state.users().delete_by_id(request.id).await?;
    tracing::info!(user_id = request.id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Force a user out: mark them inactive and drop every token they hold.
pub async fn log_user_out_and_set_inactive(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.users().deactivate(id).await?;
    tracing::info!(user_id = id, "User logged out and deactivated");

    Ok(StatusCode::NO_CONTENT)
}
