//! Session endpoints: login, logout and token validation.
//!
//! - POST /users/login - Exchange email + password for a bearer token
//! - POST /users/logout - Revoke the presented token
//! - POST /validate-token - Report whether a token is still live

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    models::token::{LoginRequest, LoginResponse, TokenRequest, ValidTokenResponse},
    services::token_service::generate_token,
    state::AppState,
};

/// Authenticate a user and issue a fresh token.
///
/// # Endpoint
///
/// `POST /users/login`
///
/// # Process
///
/// 1. Look the user up by email
/// 2. Verify the password against the stored argon2 hash (or a dummy hash
///    when the email is unknown, so both failures cost the same)
/// 3. Refuse deactivated users
/// 4. Mint a token and persist its digest, revoking older tokens
///
/// # Errors
///
/// - `PasswordMismatch` (401): unknown email or wrong password
/// - `Inactive` (403): the account has been deactivated
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let users = state.users();

    let user = match users.get_by_email(&request.email).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => {
            users.reject_unknown_login(&request.password).await?;
            tracing::info!("Login rejected: unknown email");
            return Err(AppError::PasswordMismatch);
        }
        Err(e) => return Err(e),
    };

    if !users.password_matches(&user, &request.password).await? {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::PasswordMismatch);
    }

    if !user.is_active() {
        tracing::info!(user_id = user.id, "Login rejected: user inactive");
        return Err(AppError::Inactive);
    }

    let new_token = generate_token(user.id, state.token_ttl);
    let token = state.tokens().insert(&new_token, &user).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: new_token.plaintext,
        expiry: token.expiry,
        user: user.into(),
    }))
}

/// Revoke the token in the body.
///
/// Unknown tokens still answer 204: the session is gone either way.
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    state.tokens().delete_by_token(&request.token).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /validate-token`
pub async fn validate_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<ValidTokenResponse>, AppError> {
    let valid = state.tokens().is_valid(&request.token).await?;

    Ok(Json(ValidTokenResponse { valid }))
}
