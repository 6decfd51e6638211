//! Bearer token authentication middleware.
//!
//! This middleware intercepts every `/admin` request to:
//! 1. Read the `Authorization: Bearer <token>` header
//! 2. Resolve the token and its owning user through the token service
//! 3. Inject authentication context into the request
//! 4. Reject the request with the token service's error otherwise

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::user::User, state::AppState};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>` to learn who is acting,
/// e.g. to stamp the author of a new blog.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i32,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self { user_id: user.id }
    }
}

/// Token authentication middleware function.
///
/// # Returns
///
/// - `Ok(Response)` if authenticated (calls next handler)
/// - `Err(MalformedHeader | MalformedToken | Expired)`: HTTP 401
/// - `Err(InvalidToken)`: unknown token or its user is gone, HTTP 401
/// - `Err(Inactive)`: the token belongs to a deactivated user, HTTP 403
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AppError::MalformedHeader)?),
        None => None,
    };

    let user = state
        .tokens()
        .authenticate_request(header)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::InvalidToken,
            other => other,
        })
        .inspect_err(|e| tracing::warn!(path = %request.uri().path(), "Rejected admin request: {}", e))?;

    tracing::debug!(user_id = user.id, email = %user.email, "Authenticated admin request");
    request.extensions_mut().insert(AuthContext::from(&user));

    Ok(next.run(request).await)
}
