//! Handlers for `/visitors` endpoints.
//!
//! | Method   | Path             | Notes |
//! |----------|------------------|-------|
//! | `POST`   | `/visitors`      | Body: [`NewVisitor`]; returns 201 + populated visitor |
//! | `GET`    | `/visitors`      | Optional `?status=`; scoped to what the caller may see |
//! | `PUT`    | `/visitors/{id}` | Body: [`VisitorPatch`]; meaning depends on the caller's role |
//! | `DELETE` | `/visitors/{id}` | Committee, admin or the original logger |

use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::Response,
};
use serde::{Deserialize, Serialize};
use society_core::{
  service::VisitorService,
  store::SocietyStore,
  visitor::{NewVisitor, VisitorPatch, VisitorStatus, VisitorView},
};
use uuid::Uuid;

use crate::{
  actor::CurrentActor,
  envelope::success,
  error::ApiError,
  extract::{Json, Path},
};

#[derive(Serialize)]
struct One {
  visitor: VisitorView,
}

#[derive(Serialize)]
struct Many {
  visitors: Vec<VisitorView>,
}

#[derive(Serialize)]
struct Nothing {}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /visitors`
pub async fn create<S>(
  State(service): State<VisitorService<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewVisitor>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let visitor = service.create(&actor, body).await?;
  Ok(success(StatusCode::CREATED, One { visitor }, Some("Visitor scheduled")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<String>,
}

/// `GET /visitors[?status=<status>]`
pub async fn list<S>(
  State(service): State<VisitorService<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let status = params
    .status
    .as_deref()
    .filter(|s| !s.is_empty())
    .map(VisitorStatus::parse)
    .transpose()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let visitors = service.list(&actor, status).await?;
  tracing::debug!(count = visitors.len(), role = %actor.role, "listed visitors");
  Ok(success(StatusCode::OK, Many { visitors }, None))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /visitors/{id}`
pub async fn update<S>(
  State(service): State<VisitorService<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<VisitorPatch>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let visitor = service.update(&actor, id, body).await?;
  Ok(success(StatusCode::OK, One { visitor }, Some("Visitor updated")))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /visitors/{id}`
pub async fn delete_one<S>(
  State(service): State<VisitorService<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  service.delete(&actor, id).await?;
  Ok(success(StatusCode::OK, Nothing {}, Some("Visitor deleted")))
}
