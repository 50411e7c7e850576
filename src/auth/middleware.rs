use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::tokens::TokenService;
use crate::{error::UserError, users::models::UserId};

/// Identity of the caller, attached to one request by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the bearer token and hands the request on with an [`AuthContext`].
/// Missing, invalid and expired tokens all produce the same 401.
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, UserError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        warn!("missing bearer credential");
        UserError::Unauthorized
    })?;

    let claims = tokens.verify(token).map_err(|e| {
        warn!(reason = %e, "rejected bearer credential");
        UserError::Unauthorized
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(UserError::Unauthorized)
    }
}
