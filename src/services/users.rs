use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    errors::AuthError,
    models::user::{EditUserRequest, NewUser, User, UserCredentials, UserRole},
};

/// Read access to stored accounts, as needed by login and refresh.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// `Ok(None)` when no account matches; `Err` only for backend faults.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserCredentials>, AuthError>;
}

/// `UserLookup` over the `users` table. Usernames are stored upper-cased.
pub struct PgUserLookup {
    pool: PgPool,
}

impl PgUserLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserLookup {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserCredentials>, AuthError> {
        let user = UserService::get(&self.pool, identifier)
            .await
            .map(Some)
            .or_else(|e| match e {
                sqlx::Error::RowNotFound => Ok(None),
                e => Err(AuthError::UserLookup(e.to_string())),
            })?;

        user.map(UserCredentials::try_from)
            .transpose()
            .map_err(|e| AuthError::UserLookup(format!("user {identifier}: {e}")))
    }
}

const USER_COLUMNS: &str =
    "user_id, username, email, name, password, role, created_at, updated_at";

pub struct UserService;

impl UserService {
    pub async fn insert(pool: &PgPool, user: &NewUser) -> sqlx::Result<i64> {
        let now = Utc::now().timestamp();
        sqlx::query_scalar(
            "INSERT INTO users (username, email, name, password, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING user_id",
        )
        .bind(user.username.to_uppercase())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Create the account, or reset password and role if the username exists.
    pub async fn upsert(pool: &PgPool, user: &NewUser) -> sqlx::Result<i64> {
        let now = Utc::now().timestamp();
        sqlx::query_scalar(
            "INSERT INTO users (username, email, name, password, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             ON CONFLICT (username) DO UPDATE
                SET password = EXCLUDED.password, role = EXCLUDED.role, updated_at = EXCLUDED.updated_at
             RETURNING user_id",
        )
        .bind(user.username.to_uppercase())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &PgPool, username: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username.to_uppercase())
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn edit(
        pool: &PgPool,
        username: &str,
        body: &EditUserRequest,
        role: UserRole,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = $2, name = $3, role = $4, updated_at = $5
             WHERE username = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username.to_uppercase())
        .bind(body.email.trim())
        .bind(body.name.trim())
        .bind(role.as_str())
        .bind(Utc::now().timestamp())
        .fetch_one(pool)
        .await
    }

    pub async fn change_password(pool: &PgPool, username: &str, password_hash: &str) -> sqlx::Result<()> {
        let res = sqlx::query("UPDATE users SET password = $2, updated_at = $3 WHERE username = $1")
            .bind(username.to_uppercase())
            .bind(password_hash)
            .bind(Utc::now().timestamp())
            .execute(pool)
            .await?;
        if res.rows_affected() != 1 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn delete(pool: &PgPool, username: &str) -> sqlx::Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username.to_uppercase())
            .execute(pool)
            .await?;
        if res.rows_affected() != 1 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}
