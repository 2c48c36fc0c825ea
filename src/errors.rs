use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Rejection shape shared by every handler: status plus `{"error": ...}`.
pub type ApiRejection = (StatusCode, Json<Value>);

/// Failures of the authentication subsystem.
///
/// Only the `Display` text of client-facing variants is ever sent back;
/// server-fault variants are logged and answered with a generic message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Not a refresh token")]
    InvalidTokenType,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Malformed token claim: {0}")]
    MalformedClaims(&'static str),
    #[error("Token signing failed: {0}")]
    Signing(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("User lookup failed: {0}")]
    UserLookup(String),
}

impl AuthError {
    pub fn unauthorized() -> Self {
        AuthError::Unauthorized("Unauthorized".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::MalformedClaims(_) => StatusCode::UNAUTHORIZED,
            AuthError::InvalidTokenType => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Signing(_) | AuthError::Hashing(_) | AuthError::UserLookup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AuthError> for ApiRejection {
    fn from(err: AuthError) -> Self {
        let status = err.status();
        let message = match &err {
            AuthError::MalformedClaims(_) => {
                tracing::debug!("token rejected: {err}");
                AuthError::InvalidToken.to_string()
            }
            AuthError::Signing(_) | AuthError::Hashing(_) | AuthError::UserLookup(_) => {
                tracing::error!("{err}");
                "Internal server error".to_string()
            }
            _ => err.to_string(),
        };
        (status, Json(json!({ "error": message })))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiRejection::from(self).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiRejection {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() })))
}

/// Map a database failure onto the client-visible taxonomy.
pub fn db_error(err: sqlx::Error) -> ApiRejection {
    match &err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No data matches the given id" })),
        ),
        sqlx::Error::Database(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Input conflicts with existing data" })),
        ),
        _ => {
            tracing::error!("database error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Database error" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_faults_hide_detail() {
        let (status, Json(body)) =
            ApiRejection::from(AuthError::Signing("key material missing".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_malformed_claims_look_like_invalid_token() {
        let (status, Json(body)) = ApiRejection::from(AuthError::MalformedClaims("fresh"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[test]
    fn test_wrong_token_kind_is_unprocessable() {
        assert_eq!(AuthError::InvalidTokenType.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(db_error(sqlx::Error::RowNotFound).0, StatusCode::NOT_FOUND);
    }
}
