use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::models::{MessageResponse, NewUser, User, UserChanges, UserId};
use crate::{
    auth::{require_auth, AuthContext},
    error::{UserError, UserResult},
    extract::JsonBody,
    state::AppState,
};

/// `POST /users` is public; every other user route runs behind `require_auth`.
pub fn routes(state: &AppState) -> Router<AppState> {
    let auth = from_fn_with_state(state.clone(), require_auth);

    Router::new()
        .route(
            "/users",
            post(create_user).merge(
                get(list_users)
                    .delete(delete_user_by_name)
                    .route_layer(auth.clone()),
            ),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .route_layer(auth),
        )
}

#[derive(Debug, Deserialize)]
pub struct DeleteByNameQuery {
    pub name: Option<String>,
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NewUser>,
) -> UserResult<(StatusCode, Json<User>)> {
    let user = state.users.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, ctx), fields(caller = ctx.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> UserResult<Json<Vec<User>>> {
    Ok(Json(state.users.list_users().await?))
}

#[instrument(skip(state, ctx), fields(caller = ctx.user_id))]
pub async fn get_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<UserId>,
) -> UserResult<Json<User>> {
    Ok(Json(state.users.get_user(id).await?))
}

#[instrument(skip(state, ctx, payload), fields(caller = ctx.user_id))]
pub async fn update_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<UserId>,
    JsonBody(payload): JsonBody<UserChanges>,
) -> UserResult<Json<MessageResponse>> {
    state.users.update_user(id, payload).await?;
    Ok(Json(MessageResponse::new("user updated")))
}

#[instrument(skip(state, ctx), fields(caller = ctx.user_id))]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<UserId>,
) -> UserResult<Json<MessageResponse>> {
    state.users.delete_by_id(id).await?;
    Ok(Json(MessageResponse::new("user deleted")))
}

#[instrument(skip(state, ctx), fields(caller = ctx.user_id))]
pub async fn delete_user_by_name(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<DeleteByNameQuery>,
) -> UserResult<Json<MessageResponse>> {
    let name = query
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| UserError::Validation("name is required".into()))?;
    state.users.delete_by_name(&name).await?;
    Ok(Json(MessageResponse::new("user deleted")))
}
