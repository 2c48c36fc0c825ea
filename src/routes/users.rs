use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::{bad_request, db_error, ApiRejection},
    models::{
        auth::AuthenticatedUser,
        user::{ChangePasswordRequest, EditUserRequest, NewUser, RegisterUserRequest, User},
    },
    services::users::UserService,
    AppState,
};

/// POST /api/v1/register (ADMIN)
pub async fn register(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Json(body): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiRejection> {
    let role = body.validate().map_err(bad_request)?;
    let password_hash = state.auth.hasher().hash(&body.password)?;

    let new_user = NewUser {
        username: body.username.trim().to_string(),
        email: body.email.trim().to_string(),
        name: body.name.trim().to_string(),
        password_hash,
        role,
    };
    let user_id = UserService::insert(&state.db, &new_user)
        .await
        .map_err(db_error)?;

    tracing::info!("{} registered user {} as {}", admin.identity, new_user.username, role);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user_id": user_id, "username": new_user.username.to_uppercase() })),
    ))
}

/// GET /api/v1/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiRejection> {
    UserService::find(&state.db).await.map(Json).map_err(db_error)
}

/// GET /api/v1/users/{username}
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ApiRejection> {
    UserService::get(&state.db, &username)
        .await
        .map(Json)
        .map_err(db_error)
}

/// PUT /api/v1/users/{username} (ADMIN)
pub async fn edit_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(body): Json<EditUserRequest>,
) -> Result<Json<User>, ApiRejection> {
    let role = body.validate().map_err(bad_request)?;
    UserService::edit(&state.db, &username, &body, role)
        .await
        .map(Json)
        .map_err(db_error)
}

/// DELETE /api/v1/users/{username} (ADMIN). Admins cannot delete themselves.
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiRejection> {
    if admin.identity.eq_ignore_ascii_case(&username) {
        return Err(bad_request("Cannot delete your own account"));
    }

    UserService::delete(&state.db, &username)
        .await
        .map_err(db_error)?;

    tracing::info!("{} deleted user {}", admin.identity, username.to_uppercase());
    Ok(Json(json!({ "message": format!("user {username} deleted") })))
}

/// GET /api/v1/profile
pub async fn profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<User>, ApiRejection> {
    UserService::get(&state.db, &user.identity)
        .await
        .map(Json)
        .map_err(db_error)
}

/// POST /api/v1/change-password (fresh token required)
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiRejection> {
    let len = body.new_password.chars().count();
    if !(3..=20).contains(&len) {
        return Err(bad_request("password must be between 3 and 20 characters"));
    }

    let stored = UserService::get(&state.db, &user.identity)
        .await
        .map_err(db_error)?;
    let hasher = state.auth.hasher();
    if !hasher.matches(&body.current_password, &stored.password) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Current password is incorrect" })),
        ));
    }

    let password_hash = hasher.hash(&body.new_password)?;
    UserService::change_password(&state.db, &user.identity, &password_hash)
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "message": "Password changed" })))
}
