/// Authentication middleware for Axum
///
/// Validates the `Authorization: Bearer <token>` header, loads the user the
/// token names, and adds a [`CurrentUser`] to the request extensions. Handlers
/// take the user from there and pass it explicitly into the services.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Extension, Router};
/// use taskman_shared::auth::middleware::{require_user, CurrentUser};
/// use taskman_shared::store::{MemoryStore, Store};
///
/// async fn whoami(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
///     user.to_string()
/// }
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let secret = "test-secret-key-at-least-32-bytes-long".to_string();
///
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         require_user(store.clone(), secret.clone(), req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::jwt::{validate_token, JwtError};
use crate::models::user::User;
use crate::store::Store;

/// The authenticated user, added to request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header is not a bearer token
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    UnknownUser,

    /// Store lookup failed
    StoreError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg),
            AuthError::UnknownUser => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AuthError::StoreError(msg) => {
                tracing::error!(error = %msg, "User lookup failed during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let error = if status == StatusCode::BAD_REQUEST {
            "bad_request"
        } else if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else {
            "internal_error"
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Resolves the user behind a request's bearer token
pub async fn authenticate_headers(
    store: &dyn Store,
    secret: &str,
    headers: &HeaderMap,
) -> Result<User, AuthError> {
    let token = bearer_token(headers)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    store
        .find_user(claims.sub)
        .await
        .map_err(|e| AuthError::StoreError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)
}

/// Rejects requests without a valid token and attaches the [`CurrentUser`]
pub async fn require_user(
    store: Arc<dyn Store>,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate_headers(store.as_ref(), &secret, req.headers()).await?;

    tracing::debug!(user_id = %user.id, "Request authenticated");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
