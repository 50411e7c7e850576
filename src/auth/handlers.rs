use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use super::dto::{LoginRequest, LoginResponse};
use crate::{
    error::{UserError, UserResult},
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> UserResult<Json<LoginResponse>> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(UserError::Validation(
            "email and password required".into(),
        ));
    }

    let token = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;

    info!("user logged in");
    Ok(Json(LoginResponse { token }))
}
