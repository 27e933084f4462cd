//! JSON REST API for the Society Connect visitor workflow.
//!
//! Exposes an axum [`Router`] backed by any
//! [`society_core::store::SocietyStore`]. Authentication, TLS and transport
//! concerns are the caller's responsibility: the caller must insert the
//! authenticated [`society_core::role::Actor`] into the request extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", society_api::api_router(store.clone()))
//! ```

pub mod actor;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod residents;
pub mod users;
pub mod visitors;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use society_core::{
  service::{AccountService, VisitorService},
  store::SocietyStore,
};

pub use actor::CurrentActor;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SocietyStore + 'static,
{
  Router::new()
    // Visitors
    .route(
      "/visitors",
      get(visitors::list::<S>).post(visitors::create::<S>),
    )
    .route(
      "/visitors/{id}",
      put(visitors::update::<S>).delete(visitors::delete_one::<S>),
    )
    // Directory
    .route("/flats/{flat}/residents", get(residents::handler::<S>))
    .with_state(VisitorService::new(Arc::clone(&store)))
    // Accounts
    .merge(
      Router::new()
        .route("/users", get(users::list::<S>))
        .route("/users/{id}", put(users::update::<S>))
        .with_state(AccountService::new(store)),
    )
}
