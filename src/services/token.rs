use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    errors::AuthError,
    models::{
        auth::{Claims, IssuedToken, TokenGrant, TokenKind},
        user::UserRole,
    },
};

const IDENTITY_KEY: &str = "identity";
const NAME_KEY: &str = "name";
const ROLES_KEY: &str = "roles";
const EXP_KEY: &str = "exp";
const TYPE_KEY: &str = "type";
const FRESH_KEY: &str = "fresh";

/// HMAC signing secret. Built once at startup and moved into the codec.
#[derive(Clone)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(AuthError::Signing("signing secret must not be empty".into()));
        }
        Ok(Self(secret))
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(***)")
    }
}

/// Verified but not yet typed token payload.
#[derive(Debug, Clone)]
pub struct RawToken(Map<String, Value>);

#[derive(Serialize)]
struct WireClaims<'a> {
    identity: &'a str,
    name: &'a str,
    roles: UserRole,
    exp: i64,
    #[serde(rename = "type")]
    kind: u8,
    fresh: bool,
}

impl<'a> From<&'a Claims> for WireClaims<'a> {
    fn from(c: &'a Claims) -> Self {
        Self {
            identity: &c.identity,
            name: &c.name,
            roles: c.role,
            exp: c.exp,
            kind: c.kind.code(),
            fresh: c.fresh,
        }
    }
}

/// Signs claims into HS256 bearer tokens and verifies them back.
///
/// Holds no mutable state; share it behind an `Arc`.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: JwtSecret) -> Self {
        let key = secret.0.as_bytes();

        // Only HS256 is accepted; a token announcing any other algorithm is
        // rejected before its signature is looked at.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&[EXP_KEY]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Mint a token whose expiry is now + the grant's lifetime in minutes.
    pub fn issue(&self, grant: TokenGrant) -> Result<IssuedToken, AuthError> {
        let exp = grant
            .lifetime_minutes
            .checked_mul(60)
            .and_then(|secs| Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| {
                AuthError::Signing(format!("token lifetime of {} minutes overflows", grant.lifetime_minutes))
            })?;
        let claims = Claims {
            identity: grant.identity,
            name: grant.name,
            role: grant.role,
            kind: grant.kind,
            fresh: grant.fresh,
            exp,
        };
        let token = self.encode_claims(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign an already complete claims value, expiry included, as is.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            &WireClaims::from(claims),
            &self.encoding,
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Decode and verify signature, algorithm and expiry in one step.
    ///
    /// Every failure is the same `InvalidToken`, so an expired token cannot be
    /// told apart from a forged one by the caller.
    pub fn parse(&self, token: &str) -> Result<RawToken, AuthError> {
        decode::<Map<String, Value>>(token, &self.decoding, &self.validation)
            .map(|data| RawToken(data.claims))
            .map_err(|e| {
                tracing::debug!("token rejected: {e}");
                AuthError::InvalidToken
            })
    }

    /// Project the recognised fields into typed claims.
    pub fn extract_claims(&self, raw: &RawToken) -> Result<Claims, AuthError> {
        Claims::try_from(raw)
    }

    /// `parse` followed by `extract_claims`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let raw = self.parse(token)?;
        self.extract_claims(&raw)
    }
}

impl TryFrom<&RawToken> for Claims {
    type Error = AuthError;

    fn try_from(raw: &RawToken) -> Result<Self, Self::Error> {
        let map = &raw.0;

        // Identity may have been written as a string key or an integer id.
        let identity = match map.get(IDENTITY_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return Err(AuthError::MalformedClaims(IDENTITY_KEY)),
        };

        let name = map
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .ok_or(AuthError::MalformedClaims(NAME_KEY))?
            .to_string();

        let role = map
            .get(ROLES_KEY)
            .and_then(Value::as_str)
            .and_then(|r| r.parse::<UserRole>().ok())
            .ok_or(AuthError::MalformedClaims(ROLES_KEY))?;

        let exp = map
            .get(EXP_KEY)
            .and_then(Value::as_i64)
            .ok_or(AuthError::MalformedClaims(EXP_KEY))?;

        let kind = map
            .get(TYPE_KEY)
            .and_then(Value::as_u64)
            .and_then(TokenKind::from_code)
            .ok_or(AuthError::MalformedClaims(TYPE_KEY))?;

        let fresh = map
            .get(FRESH_KEY)
            .and_then(Value::as_bool)
            .ok_or(AuthError::MalformedClaims(FRESH_KEY))?;

        Ok(Claims { identity, name, role, kind, fresh, exp })
    }
}
