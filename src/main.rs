use std::sync::Arc;

use sagasql_api::{
    build_router,
    config::Config,
    db,
    services::{
        auth::AuthService,
        password::{BcryptHasher, CredentialHasher},
        token::TokenCodec,
        users::{PgUserLookup, UserLookup},
    },
    AppState,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuses to start without a non-empty JWT_SECRET.
    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let codec = Arc::new(TokenCodec::new(config.jwt_secret.clone()));
    let hasher: Arc<dyn CredentialHasher> = Arc::new(BcryptHasher::new(config.bcrypt_cost));
    let users: Arc<dyn UserLookup> = Arc::new(PgUserLookup::new(pool.clone()));
    let auth = Arc::new(AuthService::new(users, hasher, codec, config.token_policy()));
    info!(
        "Token lifetimes: access {} min, refresh {} min",
        config.access_token_minutes, config.refresh_token_minutes
    );

    let state = AppState {
        db: pool,
        config: config.clone(),
        auth,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("sagasql API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
