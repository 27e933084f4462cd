//! The `SocietyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `society-store-sqlite`).
//! Higher layers (`society-api`, `society-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  user::{NewUser, PersonRef, User},
  visitor::{VisitorLog, VisitorQuery},
};

/// Abstraction over a Society Connect storage backend.
///
/// Every write touches a single record. Visitor updates are conditional on
/// the revision the caller read, which is the only concurrency control the
/// workflow relies on.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SocietyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── User directory ────────────────────────────────────────────────────

  /// Create and persist a new user. Fails if the email is already taken.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup by email.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Every owner and tenant record for `flat`, whatever their active or
  /// approved flags, in insertion order.
  fn residents_of_flat<'a>(
    &'a self,
    flat: &'a str,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;

  /// Resolve user ids for response population. Unknown ids are skipped.
  fn people<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<PersonRef>, Self::Error>> + Send + 'a;

  /// Every account, oldest first, optionally restricted by approval state.
  fn list_users(
    &self,
    approved: Option<bool>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Overwrite the approval and activation flags. Returns `false` if no such
  /// user exists.
  fn set_account_status(
    &self,
    id: Uuid,
    is_approved: bool,
    is_active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Store a session keyed by the digest of its bearer token.
  fn create_session(
    &self,
    token_hash: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user owning an unexpired session, if any.
  fn resolve_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Returns `false` if no such session existed.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Visitor logs ──────────────────────────────────────────────────────

  /// Persist a new log exactly as given.
  fn insert_visitor<'a>(
    &'a self,
    log: &'a VisitorLog,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VisitorLog>, Self::Error>> + Send + '_;

  /// Logs matching `query`, latest expected time first.
  fn list_visitors<'a>(
    &'a self,
    query: &'a VisitorQuery,
  ) -> impl Future<Output = Result<Vec<VisitorLog>, Self::Error>> + Send + 'a;

  /// Overwrite the stored log with `log` if its stored revision still equals
  /// `expected_revision`, bumping the revision. Returns `false` when the row
  /// is gone or was modified in between.
  fn update_visitor<'a>(
    &'a self,
    log: &'a VisitorLog,
    expected_revision: u64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Returns `false` if the log did not exist.
  fn delete_visitor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
