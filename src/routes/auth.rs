use axum::{extract::State, Json};

use crate::{
    errors::{bad_request, ApiRejection},
    models::user::{LoginRequest, LoginResponse, RefreshTokenRequest, RefreshTokenResponse},
    AppState,
};

/// POST /api/v1/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiRejection> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(bad_request("username and password must not be empty"));
    }

    let res = state.auth.login(body.username.trim(), &body.password).await?;
    Ok(Json(res))
}

/// POST /api/v1/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ApiRejection> {
    if body.refresh_token.trim().is_empty() {
        return Err(bad_request("refresh_token must not be empty"));
    }

    let res = state.auth.refresh(body.refresh_token.trim()).await?;
    Ok(Json(res))
}
