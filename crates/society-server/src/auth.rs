//! Bearer-token authentication: login, logout, and the middleware that turns
//! a token into the [`Actor`] the API handlers expect.
//!
//! Tokens are 32 random bytes, hex-encoded. Only their SHA-256 digest is
//! stored, so a leaked database does not leak usable sessions.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, StatusCode, header},
  middleware::Next,
  response::Response,
};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use society_api::{envelope::success, extract::Json};
use society_core::{role::Actor, store::SocietyStore, user::User};

use crate::{AppState, error::Error};

// ─── Tokens and passwords ─────────────────────────────────────────────────────

/// A freshly issued bearer token and the digest under which it is stored.
pub struct IssuedToken {
  pub token: String,
  pub hash:  String,
}

pub fn issue_token() -> IssuedToken {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = hex::encode(bytes);
  let hash = hash_token(&token);
  IssuedToken { token, hash }
}

pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::Unauthorized)
}

fn ensure_enabled(user: &User) -> Result<(), Error> {
  if !user.is_active {
    return Err(Error::Forbidden("Account is deactivated".into()));
  }
  if !user.is_approved {
    return Err(Error::Forbidden("Account is awaiting committee approval".into()));
  }
  Ok(())
}

// ─── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the bearer token to an [`Actor`] and make it available to the
/// handlers through request extensions.
pub async fn require_actor<S>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error>
where
  S: SocietyStore + 'static,
{
  let hash = hash_token(bearer_token(req.headers())?);
  let user = state
    .store
    .resolve_session(&hash, Utc::now())
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::Unauthorized)?;
  ensure_enabled(&user)?;

  let actor: Actor = user.actor();
  tracing::debug!(user = %actor.id, role = %actor.role, "authenticated");
  req.extensions_mut().insert(actor);
  Ok(next.run(req).await)
}

// ─── Login / logout ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Serialize)]
struct Session {
  token: String,
  user:  User,
}

/// `POST /api/auth/login`, body: `{"email": "...", "password": "..."}`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, Error>
where
  S: SocietyStore + 'static,
{
  if body.email.trim().is_empty() || body.password.is_empty() {
    return Err(Error::BadRequest("Email and password are required".into()));
  }

  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .filter(|u| verify_password(&body.password, &u.password_hash))
    .ok_or(Error::InvalidCredentials)?;
  ensure_enabled(&user)?;

  let issued = issue_token();
  let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
  state
    .store
    .create_session(issued.hash, user.id, expires_at)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(user = %user.id, role = %user.role, "login");
  Ok(success(
    StatusCode::OK,
    Session { token: issued.token, user },
    Some("Logged in"),
  ))
}

/// `POST /api/auth/logout`: drops the session named by the bearer token.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: SocietyStore + 'static,
{
  let hash = hash_token(bearer_token(&headers)?);
  let existed = state
    .store
    .delete_session(&hash)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  if !existed {
    return Err(Error::Unauthorized);
  }
  Ok(success(StatusCode::OK, serde_json::json!({}), Some("Logged out")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_and_hash_stably() {
    let a = issue_token();
    let b = issue_token();
    assert_ne!(a.token, b.token);
    assert_eq!(a.token.len(), 64);
    assert_eq!(hash_token(&a.token), a.hash);
    assert_ne!(a.hash, a.token);
  }

  #[test]
  fn password_roundtrip() {
    let phc = hash_password("s3cret").unwrap();
    assert!(verify_password("s3cret", &phc));
    assert!(!verify_password("wrong", &phc));
    assert!(!verify_password("s3cret", "not-a-phc-string"));
  }

  #[test]
  fn bearer_parsing() {
    let mut headers = HeaderMap::new();
    assert!(matches!(bearer_token(&headers), Err(Error::Unauthorized)));

    headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
    assert!(matches!(bearer_token(&headers), Err(Error::Unauthorized)));

    headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
    assert_eq!(bearer_token(&headers).unwrap(), "abc123");
  }
}
