use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::UserError;

/// `Json<T>` whose rejections come back as a 400 `UserError::Validation`
/// with a fixed message. Serde's detail is logged, never sent.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!(error = %e.body_text(), "json body rejected");
            UserError::Validation(rejection_message(&e).into())
        })?;
        Ok(JsonBody(value))
    }
}

fn rejection_message(e: &JsonRejection) -> &'static str {
    match e {
        JsonRejection::MissingJsonContentType(_) => "expected Content-Type: application/json",
        JsonRejection::JsonSyntaxError(_) => "malformed JSON body",
        JsonRejection::JsonDataError(_) => "invalid field types in request body",
        _ => "invalid request body",
    }
}
