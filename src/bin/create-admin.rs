/// Create an ADMIN account, or reset the password and role of an existing one.
/// Replaces registering the first admin through an unauthenticated route.
///
/// Usage: create-admin --username NAME --email EMAIL --name "Full Name" [--password PW]
///   Without --password a random one is generated and printed once.

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use sqlx::postgres::PgPoolOptions;

use sagasql_api::{
    models::user::{NewUser, UserRole},
    services::{
        password::{BcryptHasher, CredentialHasher},
        users::UserService,
    },
};

#[derive(Parser)]
#[command(name = "create-admin", about = "Create or reset an ADMIN account")]
struct Args {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    /// Password (3 to 20 characters); generated when omitted
    #[arg(long)]
    password: Option<String>,
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let cost = match std::env::var("BCRYPT_COST") {
        Ok(v) => v.parse().context("BCRYPT_COST must be a number")?,
        Err(_) => bcrypt::DEFAULT_COST,
    };

    let generated = args.password.is_none();
    let password = args.password.unwrap_or_else(generate_password);
    if !(3..=20).contains(&password.chars().count()) {
        anyhow::bail!("password must be between 3 and 20 characters");
    }

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    sagasql_api::db::run_migrations(&pool).await?;

    let password_hash = BcryptHasher::new(cost).hash(&password)?;
    let user_id = UserService::upsert(
        &pool,
        &NewUser {
            username: args.username.clone(),
            email: args.email,
            name: args.name,
            password_hash,
            role: UserRole::Admin,
        },
    )
    .await?;

    tracing::info!("Admin {} ready (user_id {})", args.username.to_uppercase(), user_id);
    if generated {
        println!("Generated password: {password}");
    }

    Ok(())
}
