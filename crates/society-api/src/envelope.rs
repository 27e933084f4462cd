//! The `{ success, data, message }` response envelope shared by every
//! endpoint.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

/// A successful response carrying `data`.
pub fn success<T: Serialize>(
  status: StatusCode,
  data: T,
  message: Option<&str>,
) -> Response {
  let body = Envelope {
    success: true,
    data:    Some(data),
    message: message.map(str::to_owned),
  };
  (status, Json(body)).into_response()
}

/// A failed response: `{ "success": false, "message": ... }`.
pub fn failure(status: StatusCode, message: String) -> Response {
  let body = Envelope::<()> {
    success: false,
    data:    None,
    message: Some(message),
  };
  (status, Json(body)).into_response()
}
