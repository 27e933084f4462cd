//! [`VisitorService`] and [`AccountService`]: run workflow rules against a
//! [`SocietyStore`].
//!
//! Each operation is: load what the rule needs, apply the rule, perform one
//! write, populate references for the response.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  WorkflowError,
  role::{Actor, Role},
  store::SocietyStore,
  user::{AccountPatch, PersonRef, User},
  visitor::{NewVisitor, VisitorLog, VisitorPatch, VisitorStatus, VisitorView},
  workflow::{self, CreationPlan, InitialApproval},
};

/// Failure of a service operation: either the workflow refused the request
/// or the backend failed.
#[derive(Debug, Error)]
pub enum ServiceError<E: std::error::Error + 'static> {
  #[error(transparent)]
  Workflow(#[from] WorkflowError),

  #[error("store error: {0}")]
  Store(#[source] E),
}

pub type ServiceResult<T, S> =
  Result<T, ServiceError<<S as SocietyStore>::Error>>;

/// Visitor operations on behalf of an authenticated [`Actor`].
///
/// Cloning is cheap; the store is reference-counted.
pub struct VisitorService<S> {
  store: Arc<S>,
}

impl<S> Clone for VisitorService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: SocietyStore> VisitorService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Log a new visitor, resolving an approver for security walk-ins.
  pub async fn create(
    &self,
    actor: &Actor,
    mut input: NewVisitor,
  ) -> ServiceResult<VisitorView, S> {
    let expected_time = workflow::validate_new_visitor(&input)?;
    input.flat_to_visit = input.flat_to_visit.trim().to_owned();
    let flat = input.flat_to_visit.as_str();

    let approval = match workflow::plan_creation(actor, input.status)? {
      CreationPlan::PreApproved(status) => InitialApproval::Granted(status),
      CreationPlan::AwaitApproval => {
        let requested =
          workflow::parse_requested_approver(input.needs_approval_from.as_deref())?;
        let approver = match requested {
          Some(id) => {
            let candidate = self.store.get_user(id).await.map_err(ServiceError::Store)?;
            workflow::validate_approver(candidate.as_ref(), flat)?
          }
          None => {
            let residents = self
              .store
              .residents_of_flat(flat)
              .await
              .map_err(ServiceError::Store)?;
            workflow::select_approver(flat, &residents)?
          }
        };
        InitialApproval::Required { approver }
      }
    };

    let log = workflow::new_log(actor, input, expected_time, approval, Utc::now());
    self.store.insert_visitor(&log).await.map_err(ServiceError::Store)?;

    tracing::info!(
      visitor = %log.id,
      flat = %log.flat_to_visit,
      status = %log.status,
      by = %actor.id,
      "visitor logged"
    );
    self.populate_one(log).await
  }

  /// Logs visible to `actor`, optionally restricted to one status.
  pub async fn list(
    &self,
    actor: &Actor,
    status: Option<VisitorStatus>,
  ) -> ServiceResult<Vec<VisitorView>, S> {
    let flat_residents = match actor.resident_flat() {
      Some(flat) => self
        .store
        .residents_of_flat(flat)
        .await
        .map_err(ServiceError::Store)?,
      None => Vec::new(),
    };

    let Some(query) = workflow::list_scope(actor, status, &flat_residents) else {
      return Ok(Vec::new());
    };
    let logs = self
      .store
      .list_visitors(&query)
      .await
      .map_err(ServiceError::Store)?;
    self.populate(logs).await
  }

  /// Apply `patch` as `actor`. The write only lands if nobody else modified
  /// the log since it was read; otherwise the caller gets a conflict.
  pub async fn update(
    &self,
    actor: &Actor,
    id: Uuid,
    patch: VisitorPatch,
  ) -> ServiceResult<VisitorView, S> {
    let mut log = self.load(id).await?;
    let read_revision = log.revision;
    let before = log.status;

    workflow::apply_update(actor, &mut log, patch, Utc::now())?;

    let applied = self
      .store
      .update_visitor(&log, read_revision)
      .await
      .map_err(ServiceError::Store)?;
    if !applied {
      tracing::warn!(visitor = %id, by = %actor.id, "stale visitor update rejected");
      return Err(WorkflowError::Conflict(id).into());
    }
    log.revision = read_revision + 1;

    tracing::info!(
      visitor = %id,
      from = %before,
      to = %log.status,
      by = %actor.id,
      "visitor updated"
    );
    self.populate_one(log).await
  }

  pub async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<(), S> {
    let log = self.load(id).await?;
    workflow::authorize_delete(actor, &log)?;
    let deleted = self
      .store
      .delete_visitor(id)
      .await
      .map_err(ServiceError::Store)?;
    if !deleted {
      return Err(WorkflowError::VisitorNotFound(id).into());
    }
    tracing::info!(visitor = %id, by = %actor.id, "visitor deleted");
    Ok(())
  }

  /// Residents of `flat` who can currently approve visitors, tenants first.
  pub async fn approvers_for_flat(
    &self,
    actor: &Actor,
    flat: &str,
  ) -> ServiceResult<Vec<PersonRef>, S> {
    workflow::authorize_directory(actor, flat)?;
    let mut residents: Vec<_> = self
      .store
      .residents_of_flat(flat)
      .await
      .map_err(ServiceError::Store)?
      .into_iter()
      .filter(|u| u.can_approve_for(flat))
      .collect();
    // Stable sort keeps insertion order within each role.
    residents.sort_by_key(|u| u.role != Role::Tenant);
    Ok(residents.iter().map(|u| u.person_ref()).collect())
  }

  async fn load(&self, id: Uuid) -> ServiceResult<VisitorLog, S> {
    self
      .store
      .get_visitor(id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or_else(|| WorkflowError::VisitorNotFound(id).into())
  }

  async fn populate_one(&self, log: VisitorLog) -> ServiceResult<VisitorView, S> {
    let mut views = self.populate(vec![log]).await?;
    Ok(views.remove(0))
  }

  async fn populate(
    &self,
    logs: Vec<VisitorLog>,
  ) -> ServiceResult<Vec<VisitorView>, S> {
    let mut ids: Vec<Uuid> = logs
      .iter()
      .flat_map(|l| {
        [Some(l.logged_by), Some(l.scheduled_by), l.approved_by, l.needs_approval_from]
      })
      .flatten()
      .collect();
    ids.sort_unstable();
    ids.dedup();

    let people: HashMap<Uuid, PersonRef> = self
      .store
      .people(&ids)
      .await
      .map_err(ServiceError::Store)?
      .into_iter()
      .map(|p| (p.id, p))
      .collect();

    Ok(
      logs
        .into_iter()
        .map(|log| VisitorView::populate(log, |id| people.get(&id).cloned()))
        .collect(),
    )
  }
}

/// Committee/admin management of member accounts.
pub struct AccountService<S> {
  store: Arc<S>,
}

impl<S> Clone for AccountService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: SocietyStore> AccountService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Accounts, optionally only those with the given approval state.
  pub async fn list(
    &self,
    actor: &Actor,
    approved: Option<bool>,
  ) -> ServiceResult<Vec<User>, S> {
    workflow::authorize_account_admin(actor)?;
    self
      .store
      .list_users(approved)
      .await
      .map_err(ServiceError::Store)
  }

  /// Approve, un-approve, activate or deactivate the account `id`.
  pub async fn set_status(
    &self,
    actor: &Actor,
    id: Uuid,
    patch: AccountPatch,
  ) -> ServiceResult<User, S> {
    workflow::authorize_account_admin(actor)?;
    let mut user = self
      .store
      .get_user(id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(WorkflowError::UserNotFound(id))?;

    workflow::apply_account_patch(actor, &mut user, patch)?;

    let updated = self
      .store
      .set_account_status(id, user.is_approved, user.is_active)
      .await
      .map_err(ServiceError::Store)?;
    if !updated {
      return Err(WorkflowError::UserNotFound(id).into());
    }
    tracing::info!(
      user = %id,
      approved = user.is_approved,
      active = user.is_active,
      by = %actor.id,
      "account status changed"
    );
    Ok(user)
  }
}
