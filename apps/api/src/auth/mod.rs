//! Request authentication and ownership checks.
//!
//! Cookie/session handling lives in the gateway in front of this service; it
//! forwards the resolved user id in `x-user-id`. Every handler that touches
//! user data takes an [`AuthUser`] and runs the relevant [`ownership`] check.

pub mod ownership;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::Unauthorized)?;
        Ok(AuthUser { id })
    }
}
