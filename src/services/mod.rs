pub mod auth;
pub mod metrics;
pub mod password;
pub mod products;
pub mod token;
pub mod users;
