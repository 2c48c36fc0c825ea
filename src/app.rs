use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put, MethodRouter},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    middleware::auth::{require_auth, RouteGuard},
    models::user::UserRole,
    routes,
    services::auth::AuthService,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
}

/// Wrap a method router so it only runs behind `guard`.
fn guarded(guard: &RouteGuard, methods: MethodRouter<AppState>) -> MethodRouter<AppState> {
    methods.route_layer(from_fn_with_state(guard.clone(), require_auth))
}

pub fn build_router(state: AppState) -> Router {
    let codec = state.auth.codec().clone();
    let any_user = RouteGuard::any(codec.clone());
    let fresh_user = RouteGuard::any(codec.clone()).fresh();
    let admin = RouteGuard::roles(codec, &[UserRole::Admin]);

    let api = Router::new()
        // Auth
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh_token))
        .route("/profile", guarded(&any_user, get(routes::users::profile)))
        .route(
            "/change-password",
            guarded(&fresh_user, post(routes::users::change_password)),
        )
        // Users
        .route("/register", guarded(&admin, post(routes::users::register)))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/{username}",
            get(routes::users::get_user).merge(guarded(
                &admin,
                put(routes::users::edit_user).delete(routes::users::delete_user),
            )),
        )
        // Products
        .route(
            "/products",
            get(routes::products::list_products)
                .merge(guarded(&any_user, post(routes::products::create_product))),
        )
        .route(
            "/products/{id}",
            get(routes::products::get_product)
                .merge(guarded(&any_user, put(routes::products::update_product)))
                .merge(guarded(
                    &admin,
                    axum::routing::delete(routes::products::delete_product),
                )),
        )
        .route(
            "/products/{id}/image",
            guarded(&any_user, post(routes::products::upload_image)),
        );

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    let images = ServeDir::new(Path::new(&state.config.static_dir).join("image"));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .nest("/api/v1", api)
        .nest_service("/image", images)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Multipart overhead on top of the 2 MB image cap
        .layer(DefaultBodyLimit::max(routes::products::MAX_IMAGE_BYTES + 64 * 1024))
        .with_state(state)
}
