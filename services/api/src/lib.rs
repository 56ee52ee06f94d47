pub mod config;
pub mod token;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

pub use token::AppState;

/// Router for the token service, with a permissive CORS policy so a browser
/// client on another origin can fetch tokens.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(token::TOKEN_ROUTE, get(token::elevenlabs_token))
        .with_state(state)
        .layer(cors)
}
