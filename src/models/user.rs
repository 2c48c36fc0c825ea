use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Normal,
}

impl UserRole {
    /// Every role a user can be registered with.
    pub const ALL: [UserRole; 2] = [UserRole::Admin, UserRole::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "NORMAL" => Ok(UserRole::Normal),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct. Role is kept as TEXT and parsed at the edges.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// What the auth flow needs to know about a stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub identity: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: String,
}

impl TryFrom<User> for UserCredentials {
    type Error = anyhow::Error;

    fn try_from(u: User) -> Result<Self, Self::Error> {
        Ok(Self {
            role: u.role.parse()?,
            identity: u.username,
            name: u.name,
            password_hash: u.password,
        })
    }
}

/// Insert payload, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub username: String,
    pub name: String,
    pub role: UserRole,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix time at which the access token stops being accepted.
    pub expired: i64,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub expired: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

impl RegisterUserRequest {
    /// Field presence, email shape, password length and role membership.
    pub fn validate(&self) -> Result<UserRole, String> {
        if self.username.trim().is_empty() {
            return Err("username is required".into());
        }
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        validate_email(&self.email)?;
        let len = self.password.chars().count();
        if !(3..=20).contains(&len) {
            return Err("password must be between 3 and 20 characters".into());
        }
        parse_role(&self.role)
    }
}

#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub email: String,
    pub name: String,
    pub role: String,
}

impl EditUserRequest {
    pub fn validate(&self) -> Result<UserRole, String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        validate_email(&self.email)?;
        parse_role(&self.role)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email is required".into());
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err("email is not valid".into()),
    }
}

fn parse_role(role: &str) -> Result<UserRole, String> {
    role.parse().map_err(|_| {
        let available: Vec<&str> = UserRole::ALL.iter().map(UserRole::as_str).collect();
        format!("role is not available, use one of {available:?}")
    })
}
