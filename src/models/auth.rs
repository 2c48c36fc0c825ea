use super::user::{UserCredentials, UserRole};

/// Which exchange a token is good for. Carried on the wire as the integer
/// `type` field: 0 for access, 1 for refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn code(self) -> u8 {
        match self {
            TokenKind::Access => 0,
            TokenKind::Refresh => 1,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(TokenKind::Access),
            1 => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

/// Claims carried by a signed token, as read back after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub identity: String,
    pub name: String,
    pub role: UserRole,
    pub kind: TokenKind,
    /// True only for access tokens handed out by a password login.
    pub fresh: bool,
    /// Absolute unix time (seconds).
    pub exp: i64,
}

/// Everything needed to mint a token; the expiry is fixed at issue time.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub identity: String,
    pub name: String,
    pub role: UserRole,
    pub kind: TokenKind,
    pub fresh: bool,
    pub lifetime_minutes: i64,
}

impl TokenGrant {
    pub fn access(user: &UserCredentials, lifetime_minutes: i64, fresh: bool) -> Self {
        Self {
            identity: user.identity.clone(),
            name: user.name.clone(),
            role: user.role,
            kind: TokenKind::Access,
            fresh,
            lifetime_minutes,
        }
    }

    pub fn refresh(user: &UserCredentials, lifetime_minutes: i64) -> Self {
        Self {
            identity: user.identity.clone(),
            name: user.name.clone(),
            role: user.role,
            kind: TokenKind::Refresh,
            fresh: false,
            lifetime_minutes,
        }
    }
}

/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Validated caller, placed in request extensions by the route guard.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl std::ops::Deref for AuthenticatedUser {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
