use axum::Router;

use crate::state::AppState;

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod repo;
pub mod service;
pub mod validator;

pub use repo::{PgUserRepository, UserRepository};
pub use service::UserService;

pub fn router(state: &AppState) -> Router<AppState> {
    handlers::routes(state)
}
