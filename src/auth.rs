//! Identity of the caller.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! principal in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use mongodb::bson::oid::ObjectId;

use crate::{error::BookingError, models::user_model::User, store::CinemaStore};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub ObjectId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| ObjectId::parse_str(s.trim()).ok())
            .map(Self)
            .ok_or(BookingError::Unauthenticated)
    }
}

/// Catalog writes are reserved to staff accounts.
pub async fn require_staff(store: &dyn CinemaStore, user: CurrentUser) -> Result<User, BookingError> {
    match store.user(user.0).await? {
        Some(user) if user.is_staff => Ok(user),
        Some(_) => Err(BookingError::Forbidden),
        None => Err(BookingError::Unauthenticated),
    }
}
