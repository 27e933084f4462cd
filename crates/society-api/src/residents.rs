//! Handler for `GET /flats/{flat}/residents`: who can approve visitors for
//! a flat, tenants first. Security uses this to pick an explicit approver.

use axum::{
  extract::State,
  http::StatusCode,
  response::Response,
};
use serde::Serialize;
use society_core::{service::VisitorService, store::SocietyStore, user::PersonRef};

use crate::{actor::CurrentActor, envelope::success, error::ApiError, extract::Path};

#[derive(Serialize)]
struct Residents {
  residents: Vec<PersonRef>,
}

pub async fn handler<S>(
  State(service): State<VisitorService<S>>,
  CurrentActor(actor): CurrentActor,
  Path(flat): Path<String>,
) -> Result<Response, ApiError>
where
  S: SocietyStore,
{
  let residents = service.approvers_for_flat(&actor, &flat).await?;
  Ok(success(StatusCode::OK, Residents { residents }, None))
}
