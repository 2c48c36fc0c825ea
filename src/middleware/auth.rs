use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::AuthError,
    models::{
        auth::{AuthenticatedUser, Claims, TokenKind},
        user::UserRole,
    },
    services::{metrics::AUTH_REJECTIONS_COUNTER, token::TokenCodec},
};

const BEARER: &str = "Bearer";

/// Per-route authorization policy: which roles may pass and whether the
/// access token must come straight from a password login.
#[derive(Clone)]
pub struct RouteGuard {
    codec: Arc<TokenCodec>,
    roles: Vec<UserRole>,
    require_fresh: bool,
}

impl RouteGuard {
    /// Any authenticated caller.
    pub fn any(codec: Arc<TokenCodec>) -> Self {
        Self::roles(codec, &[])
    }

    /// Callers whose role is in `roles`; an empty set admits every role.
    pub fn roles(codec: Arc<TokenCodec>, roles: &[UserRole]) -> Self {
        Self {
            codec,
            roles: roles.to_vec(),
            require_fresh: false,
        }
    }

    pub fn fresh(mut self) -> Self {
        self.require_fresh = true;
        self
    }

    /// Decide on an `Authorization` header value.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let token = bearer_token(authorization).ok_or_else(|| reject("missing_header"))?;

        let claims = self.codec.verify(token).map_err(|e| {
            tracing::debug!("guard: {e}");
            reject("invalid_token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(reject("invalid_token"));
        }

        if self.require_fresh && !claims.fresh {
            AUTH_REJECTIONS_COUNTER.with_label_values(&["not_fresh"]).inc();
            return Err(AuthError::Unauthorized(
                "This action requires a token from a new login".into(),
            ));
        }

        if !self.roles.is_empty() && !self.roles.contains(&claims.role) {
            AUTH_REJECTIONS_COUNTER.with_label_values(&["forbidden_role"]).inc();
            let required: Vec<&str> = self.roles.iter().map(UserRole::as_str).collect();
            return Err(AuthError::Unauthorized(format!(
                "Unauthorized, requires role {required:?}"
            )));
        }

        Ok(claims)
    }
}

fn reject(reason: &str) -> AuthError {
    AUTH_REJECTIONS_COUNTER.with_label_values(&[reason]).inc();
    AuthError::unauthorized()
}

/// `Bearer <token>`: exactly two space-separated parts.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Middleware form of [`RouteGuard`]. Attach with
/// `axum::middleware::from_fn_with_state(guard, require_auth)`.
pub async fn require_auth(
    State(guard): State<RouteGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let claims = guard.authorize(authorization)?;
    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::models::auth::TokenGrant;
    use crate::services::token::JwtSecret;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(JwtSecret::new("s3cret").unwrap()))
    }

    fn token(codec: &TokenCodec, role: UserRole, kind: TokenKind, fresh: bool) -> String {
        codec
            .issue(TokenGrant {
                identity: "BUDI".into(),
                name: "Budi".into(),
                role,
                kind,
                fresh,
                lifetime_minutes: 10,
            })
            .unwrap()
            .token
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn test_bearer_header_shape() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer abc def")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_role_gate() {
        let codec = codec();
        let normal = bearer(&token(&codec, UserRole::Normal, TokenKind::Access, false));

        let admin_only = RouteGuard::roles(codec.clone(), &[UserRole::Admin]);
        match admin_only.authorize(Some(normal.as_str())) {
            Err(AuthError::Unauthorized(msg)) => assert!(msg.contains("ADMIN")),
            other => panic!("expected role rejection, got {other:?}"),
        }

        assert!(RouteGuard::any(codec.clone()).authorize(Some(normal.as_str())).is_ok());
        assert!(RouteGuard::roles(codec.clone(), &[UserRole::Normal])
            .authorize(Some(normal.as_str()))
            .is_ok());
        assert!(RouteGuard::roles(codec, &UserRole::ALL).authorize(Some(normal.as_str())).is_ok());
    }

    #[test]
    fn test_freshness_gate() {
        let codec = codec();
        let guard = RouteGuard::any(codec.clone()).fresh();

        let stale = bearer(&token(&codec, UserRole::Normal, TokenKind::Access, false));
        assert!(matches!(guard.authorize(Some(stale.as_str())), Err(AuthError::Unauthorized(_))));

        let fresh = bearer(&token(&codec, UserRole::Normal, TokenKind::Access, true));
        let claims = guard.authorize(Some(fresh.as_str())).unwrap();
        assert!(claims.fresh);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let codec = codec();
        let refresh = bearer(&token(&codec, UserRole::Admin, TokenKind::Refresh, false));
        assert!(RouteGuard::any(codec).authorize(Some(refresh.as_str())).is_err());
    }

    #[test]
    fn test_expired_and_foreign_tokens() {
        let codec = codec();
        let expired = codec
            .encode_claims(&Claims {
                identity: "BUDI".into(),
                name: "Budi".into(),
                role: UserRole::Admin,
                kind: TokenKind::Access,
                fresh: true,
                exp: Utc::now().timestamp() - 60,
            })
            .unwrap();
        let guard = RouteGuard::any(codec);
        assert!(matches!(guard.authorize(Some(bearer(&expired).as_str())), Err(AuthError::Unauthorized(_))));

        let other = TokenCodec::new(JwtSecret::new("someone-else").unwrap());
        let foreign = bearer(&token(&other, UserRole::Admin, TokenKind::Access, true));
        assert!(guard.authorize(Some(foreign.as_str())).is_err());
    }

    async fn whoami(user: AuthenticatedUser) -> String {
        format!("{}:{}", user.identity, user.role)
    }

    fn app(guard: RouteGuard) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(guard, require_auth))
    }

    async fn call(app: Router, authorization: Option<String>) -> (StatusCode, String) {
        let mut req = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            req = req.header(header::AUTHORIZATION, value);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_middleware_hands_claims_to_handler() {
        let codec = codec();
        let admin = bearer(&token(&codec, UserRole::Admin, TokenKind::Access, true));
        let (status, body) = call(app(RouteGuard::roles(codec, &[UserRole::Admin])), Some(admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "BUDI:ADMIN");
    }

    #[tokio::test]
    async fn test_middleware_short_circuits() {
        let codec = codec();
        let normal = bearer(&token(&codec, UserRole::Normal, TokenKind::Access, true));
        let guard = RouteGuard::roles(codec, &[UserRole::Admin]);

        let (status, body) = call(app(guard.clone()), Some(normal)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("ADMIN"));

        let (status, _) = call(app(guard.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(app(guard), Some("Bearer a.b.c".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_extractor_without_guard_rejects() {
        let app = Router::new().route("/whoami", get(whoami));
        let (status, _) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
