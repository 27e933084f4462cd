//! Error types and axum `IntoResponse` implementation for the server layer.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use society_api::envelope::failure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Authentication required")]
  Unauthorized,
  #[error("Invalid email or password")]
  InvalidCredentials,
  #[error("{0}")]
  Forbidden(String),
  #[error("{0}")]
  BadRequest(String),
  #[error("password hashing failed: {0}")]
  PasswordHash(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized | Error::InvalidCredentials => {
        let mut res = failure(StatusCode::UNAUTHORIZED, self.to_string());
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"society\""),
        );
        res
      }
      Error::Forbidden(msg) => failure(StatusCode::FORBIDDEN, msg),
      Error::BadRequest(msg) => failure(StatusCode::BAD_REQUEST, msg),
      Error::PasswordHash(_) | Error::Store(_) => {
        tracing::error!(error = %self, "internal error");
        failure(
          StatusCode::INTERNAL_SERVER_ERROR,
          "Internal server error".to_owned(),
        )
      }
    }
  }
}
