pub mod health;
pub use self::health::health;

pub mod auth;

use axum::response::IntoResponse;

// plain banner for the root path, useful as a liveness probe target
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
