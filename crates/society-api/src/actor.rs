//! Extractor for the caller resolved by the authentication layer.

use axum::{extract::FromRequestParts, http::request::Parts};
use society_core::role::Actor;

use crate::error::ApiError;

/// The authenticated caller. The surrounding server inserts an [`Actor`] into
/// the request extensions before any handler runs; requests without one are
/// rejected with 401.
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Actor>()
      .cloned()
      .map(CurrentActor)
      .ok_or(ApiError::Unauthenticated)
  }
}
