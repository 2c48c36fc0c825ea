use std::env;

use crate::services::{
    auth::TokenPolicy,
    password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST},
    token::JwtSecret,
};

/// Ten years.
pub const MAX_TOKEN_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: JwtSecret,
    pub access_token_minutes: i64,
    pub refresh_token_minutes: i64,
    pub bcrypt_cost: u32,
    pub static_dir: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.into());

        let config = Self {
            database_url: get("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("Missing required env var: DATABASE_URL"))?,
            jwt_secret: JwtSecret::new(
                get("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("Missing required env var: JWT_SECRET"))?,
            )
            .map_err(|e| anyhow::anyhow!("JWT_SECRET: {e}"))?,
            access_token_minutes: or("ACCESS_TOKEN_MINUTES", "1440").parse()?,
            refresh_token_minutes: or("REFRESH_TOKEN_MINUTES", "14400").parse()?,
            bcrypt_cost: or("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string()).parse()?,
            static_dir: or("STATIC_DIR", "./static"),
            host: or("HOST", "0.0.0.0"),
            port: or("PORT", "3500").parse()?,
        };

        for (key, minutes) in [
            ("ACCESS_TOKEN_MINUTES", config.access_token_minutes),
            ("REFRESH_TOKEN_MINUTES", config.refresh_token_minutes),
        ] {
            if !(1..=MAX_TOKEN_MINUTES).contains(&minutes) {
                anyhow::bail!("{key} must be between 1 and {MAX_TOKEN_MINUTES} minutes");
            }
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&config.bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}");
        }
        Ok(config)
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            access_minutes: self.access_token_minutes,
            refresh_minutes: self.refresh_token_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/saga"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.access_token_minutes, 1440);
        assert_eq!(config.refresh_token_minutes, 14400);
        assert_eq!(config.port, 3500);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_secret_required_and_non_empty() {
        assert!(load(&[("DATABASE_URL", "postgres://localhost/saga")]).is_err());
        assert!(load(&[("DATABASE_URL", "postgres://localhost/saga"), ("JWT_SECRET", "")]).is_err());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let base = [("DATABASE_URL", "postgres://localhost/saga"), ("JWT_SECRET", "s3cret")];
        assert!(load(&[base[0], base[1], ("ACCESS_TOKEN_MINUTES", "0")]).is_err());
        assert!(load(&[base[0], base[1], ("REFRESH_TOKEN_MINUTES", "ten days")]).is_err());
        assert!(load(&[base[0], base[1], ("BCRYPT_COST", "2")]).is_err());
    }

    #[test]
    fn test_lifetimes_are_bounded() {
        let base = [("DATABASE_URL", "postgres://localhost/saga"), ("JWT_SECRET", "s3cret")];
        let max = MAX_TOKEN_MINUTES.to_string();
        let too_long = (MAX_TOKEN_MINUTES + 1).to_string();

        assert!(load(&[base[0], base[1], ("REFRESH_TOKEN_MINUTES", max.as_str())]).is_ok());
        assert!(load(&[base[0], base[1], ("REFRESH_TOKEN_MINUTES", too_long.as_str())]).is_err());
        assert!(load(&[base[0], base[1], ("ACCESS_TOKEN_MINUTES", "200000000000000000")]).is_err());
    }
}
