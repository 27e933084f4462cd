//! Account management for committee and admin.
//!
//! | Method | Path          | Notes |
//! |--------|---------------|-------|
//! | `GET`  | `/users`      | Optional `?approved=true\|false`, e.g. the sign-ups awaiting approval |
//! | `PUT`  | `/users/{id}` | Body: [`AccountPatch`]; approve or deactivate an account |

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::Response,
};
use serde::{Deserialize, Serialize};
use society_core::{
  service::AccountService,
  store::SocietyStore,
  user::{AccountPatch, User},
};
use uuid::Uuid;

use crate::{
  actor::CurrentActor,
  envelope::success,
  error::ApiError,
  extract::{Json, Path},
};

#[derive(Serialize)]
struct Many {
  users: Vec<User>,
}

#[derive(Serialize)]
struct One {
  user: User,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub approved: Option<String>,
}

/// `GET /users[?approved=<bool>]`
pub async fn list<S>(
  State(service): State<AccountService<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let approved = match params.approved.as_deref() {
    None | Some("") => None,
    Some("true") => Some(true),
    Some("false") => Some(false),
    Some(other) => {
      return Err(ApiError::BadRequest(format!(
        "approved must be true or false, got {other:?}"
      )));
    }
  };
  let users = service.list(&actor, approved).await?;
  Ok(success(StatusCode::OK, Many { users }, None))
}

/// `PUT /users/{id}`
pub async fn update<S>(
  State(service): State<AccountService<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(patch): Json<AccountPatch>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let user = service.set_status(&actor, id, patch).await?;
  Ok(success(StatusCode::OK, One { user }, Some("User updated")))
}
