/// Account endpoints
///
/// - `POST /v1/users` - Sign up (public). A bearer token is optional; when it
///   belongs to an admin the new account may be given the `admin` role.
/// - `GET /v1/users/me` - The signed-in user
/// - `GET /v1/users/:id` - Show an account (self or admin)
/// - `PATCH /v1/users/:id` - Change email, password or role (self or admin;
///   role changes need an admin)
/// - `DELETE /v1/users/:id` - Delete an account and its tasks (admin)
///
/// Accounts the caller may not manage answer 404, like missing ones.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use taskman_shared::{
    auth::{
        authorization::{can_administer_users, can_manage_user},
        middleware::{authenticate_headers, CurrentUser},
    },
    models::user::{Registration, User, UserChanges},
};
use uuid::Uuid;

/// Sign-up handler
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Field errors, including a taken email
/// - `401 Unauthorized`: A bearer token was sent but is invalid
pub async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let actor = if headers.contains_key(header::AUTHORIZATION) {
        Some(authenticate_headers(state.store.as_ref(), state.jwt_secret(), &headers).await?)
    } else {
        None
    };

    let user = state.accounts.sign_up(actor.as_ref(), form).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

pub async fn show_user(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    if !can_manage_user(&actor, id) {
        return Err(user_not_found());
    }

    let user = state.accounts.find(id).await?.ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Update handler
///
/// The password hash is only recomputed when `password` is sent and differs
/// from the current one.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<User>> {
    let user = state
        .accounts
        .update(&actor, id, changes)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !can_administer_users(&actor) {
        return Err(ApiError::Forbidden(
            "Only admins can delete accounts".to_string(),
        ));
    }

    if state.accounts.delete(&actor, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found())
    }
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}
