/// Sign-in endpoint
///
/// Exchanges email and password for a bearer token.
///
/// # Endpoint
///
/// ```text
/// POST /v1/sessions
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "user@example.com", "role": "user", ... },
///   "access_token": "eyJ...",
///   "expires_at": 1700000000
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same message for both)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskman_shared::{
    auth::jwt::{create_token, Claims},
    models::user::User,
};

/// Sign-in request
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Sign-in response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The signed-in user
    pub user: User,

    /// Bearer token for subsequent requests
    pub access_token: String,

    /// Token expiry (Unix timestamp)
    pub expires_at: i64,
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = state.accounts.authenticate(&req.email, &req.password).await?;

    let claims = Claims::with_ttl_hours(user.id, state.config.jwt.ttl_hours)?;
    let access_token = create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(SessionResponse {
        user,
        access_token,
        expires_at: claims.exp,
    }))
}
