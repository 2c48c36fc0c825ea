use std::sync::Arc;

use crate::{
    errors::AuthError,
    models::{
        auth::{TokenGrant, TokenKind},
        user::{LoginResponse, RefreshTokenResponse},
    },
    services::{
        metrics::{outcome, LOGINS_COUNTER, TOKEN_REFRESH_COUNTER},
        password::CredentialHasher,
        token::TokenCodec,
        users::UserLookup,
    },
};

const DUMMY_PASSWORD: &str = "not-a-real-account";

/// Token lifetimes, in minutes.
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub access_minutes: i64,
    pub refresh_minutes: i64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_minutes: 60 * 24,
            refresh_minutes: 60 * 24 * 10,
        }
    }
}

/// Login and refresh flows over injected lookup, hasher and codec.
pub struct AuthService {
    users: Arc<dyn UserLookup>,
    hasher: Arc<dyn CredentialHasher>,
    codec: Arc<TokenCodec>,
    policy: TokenPolicy,
    /// Checked against when the username is unknown.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserLookup>,
        hasher: Arc<dyn CredentialHasher>,
        codec: Arc<TokenCodec>,
        policy: TokenPolicy,
    ) -> Self {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD).unwrap_or_else(|e| {
            tracing::warn!("could not prepare dummy hash: {e}");
            String::new()
        });
        Self { users, hasher, codec, policy, dummy_hash }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn hasher(&self) -> &Arc<dyn CredentialHasher> {
        &self.hasher
    }

    /// Verify credentials and hand out a fresh access token plus a refresh token.
    /// Unknown user and wrong password fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let result = self.try_login(username, password).await;
        LOGINS_COUNTER.with_label_values(&[outcome(&result)]).inc();
        result
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let user = match self.users.find_by_identifier(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                // Unknown users cost one hash check too.
                let _ = self.hasher.matches(password, &self.dummy_hash);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!("login lookup for {username} failed: {e}");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.matches(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let access = self
            .codec
            .issue(TokenGrant::access(&user, self.policy.access_minutes, true))?;
        let refresh = self
            .codec
            .issue(TokenGrant::refresh(&user, self.policy.refresh_minutes))?;

        tracing::info!("user {} logged in", user.identity);

        Ok(LoginResponse {
            username: user.identity,
            name: user.name,
            role: user.role,
            access_token: access.token,
            refresh_token: refresh.token,
            expired: access.claims.exp,
        })
    }

    /// Exchange a refresh token for a new, non-fresh access token.
    ///
    /// The account is read again so role and name changes since login apply.
    /// Refresh tokens themselves are only ever minted by `login`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, AuthError> {
        let result = self.try_refresh(refresh_token).await;
        TOKEN_REFRESH_COUNTER.with_label_values(&[outcome(&result)]).inc();
        result
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, AuthError> {
        let claims = self.codec.verify(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidTokenType);
        }

        // An account deleted after login can no longer refresh.
        let user = self
            .users
            .find_by_identifier(&claims.identity)
            .await
            .map_err(|e| {
                tracing::error!("refresh lookup for {} failed: {e}", claims.identity);
                AuthError::InvalidToken
            })?
            .ok_or(AuthError::InvalidToken)?;

        let access = self
            .codec
            .issue(TokenGrant::access(&user, self.policy.access_minutes, false))?;

        Ok(RefreshTokenResponse {
            access_token: access.token,
            expired: access.claims.exp,
        })
    }
}
