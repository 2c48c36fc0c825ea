// Library exports for binary tools and tests
pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use app::{build_router, AppState};
