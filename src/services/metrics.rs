use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref TOKEN_REFRESH_COUNTER: CounterVec = register_counter_vec!(
        "api_token_refresh_total",
        "Refresh-token exchanges by outcome",
        &["status"]
    ).unwrap();

    pub static ref AUTH_REJECTIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_auth_rejections_total",
        "Requests turned away by the route guard, by reason",
        &["reason"]
    ).unwrap();
}

/// Short outcome label for a finished auth operation.
pub fn outcome<T>(result: &Result<T, crate::errors::AuthError>) -> &'static str {
    use crate::errors::AuthError;
    match result {
        Ok(_) => "success",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(AuthError::InvalidTokenType) => "wrong_token_type",
        Err(AuthError::InvalidToken | AuthError::MalformedClaims(_) | AuthError::Unauthorized(_)) => {
            "invalid_token"
        }
        Err(_) => "error",
    }
}
