//! HTTP server for Society Connect.
//!
//! Wires the JSON API from `society-api` behind bearer-token authentication,
//! adds the login/logout endpoints and a health check.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router, middleware,
  routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use society_core::store::SocietyStore;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_session_ttl_hours() -> i64 { 24 * 7 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `SOCIETY_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// How long a login stays valid.
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the auth handlers and middleware.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// | Path | Auth |
/// |------|------|
/// | `GET /health` | none |
/// | `POST /api/auth/login`, `POST /api/auth/logout` | none / bearer |
/// | everything else under `/api` | bearer |
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SocietyStore + 'static,
{
  let sessions = Router::new()
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .with_state(state.clone());

  // `layer` only wraps routes added before it, so the session routes merged
  // afterwards stay public.
  let api = society_api::api_router(Arc::clone(&state.store))
    .layer(middleware::from_fn_with_state(
      state,
      auth::require_actor::<S>,
    ))
    .merge(sessions);

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}
