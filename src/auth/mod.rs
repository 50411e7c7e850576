use crate::state::AppState;
use axum::Router;

pub mod claims;
mod dto;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod tokens;

pub use middleware::{require_auth, AuthContext};
pub use tokens::TokenService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
