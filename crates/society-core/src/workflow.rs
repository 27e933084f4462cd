//! The visitor approval workflow.
//!
//! Everything here is pure: callers load whatever directory data a rule
//! needs, pass it in together with the current time, and persist the result.
//! Each rule matches on [`Role`] exhaustively.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  WorkflowError,
  role::{Actor, Role},
  user::{AccountPatch, User},
  visitor::{
    NewVisitor, VisitorLog, VisitorPatch, VisitorQuery, VisitorScope,
    VisitorStatus,
  },
};

type Result<T, E = WorkflowError> = std::result::Result<T, E>;

// ─── Create ──────────────────────────────────────────────────────────────────

/// How a new visitor log enters the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPlan {
  /// A resident of the flat must decide before the visitor may enter.
  AwaitApproval,
  /// The log starts out approved, in the given status.
  PreApproved(VisitorStatus),
}

/// Decide how a visitor created by `actor` enters the workflow.
///
/// Security staff log walk-ins, which need a resident's approval unless they
/// explicitly pass `scheduled` (or `checked_in` for a visitor already let
/// through). Everyone else schedules visitors on their own authority; any
/// status they pass is ignored.
pub fn plan_creation(
  actor: &Actor,
  requested: Option<VisitorStatus>,
) -> Result<CreationPlan> {
  match actor.role {
    Role::Security => match requested {
      None | Some(VisitorStatus::PendingApproval) => {
        Ok(CreationPlan::AwaitApproval)
      }
      Some(s @ (VisitorStatus::Scheduled | VisitorStatus::CheckedIn)) => {
        Ok(CreationPlan::PreApproved(s))
      }
      Some(s @ (VisitorStatus::Rejected | VisitorStatus::CheckedOut)) => {
        Err(WorkflowError::UnsupportedStatus(s.into()))
      }
    },
    Role::Owner | Role::Tenant | Role::Committee | Role::Admin => {
      Ok(CreationPlan::PreApproved(VisitorStatus::Scheduled))
    }
  }
}

/// Check the fields every visitor needs and return the expected time.
pub fn validate_new_visitor(input: &NewVisitor) -> Result<DateTime<Utc>> {
  if input.name.trim().is_empty() {
    return Err(WorkflowError::MissingField("name"));
  }
  if input.phone.trim().is_empty() {
    return Err(WorkflowError::MissingField("phone"));
  }
  if input.flat_to_visit.trim().is_empty() {
    return Err(WorkflowError::MissingField("flatToVisit"));
  }
  input
    .expected_time
    .ok_or(WorkflowError::MissingField("expectedTime"))
}

/// Parse the approver id supplied by security. Blank input means "choose for
/// me"; anything that is not a UUID cannot name a resident.
pub fn parse_requested_approver(raw: Option<&str>) -> Result<Option<Uuid>> {
  match raw.map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => Uuid::parse_str(s)
      .map(Some)
      .map_err(|_| WorkflowError::InvalidApprover),
  }
}

/// Accept an explicitly requested approver only if they are an active,
/// approved owner or tenant of `flat`.
pub fn validate_approver(candidate: Option<&User>, flat: &str) -> Result<Uuid> {
  match candidate {
    Some(user) if user.can_approve_for(flat) => Ok(user.id),
    _ => Err(WorkflowError::InvalidApprover),
  }
}

/// Pick who approves a walk-in for `flat` from the flat's residents.
///
/// Tie-break: the first eligible tenant, else the first eligible owner, where
/// "first" is the order of `residents`. The tenant is preferred because they
/// are the one living in the flat. Ineligible entries (inactive, unapproved,
/// another flat, non-resident roles) are skipped.
pub fn select_approver(flat: &str, residents: &[User]) -> Result<Uuid> {
  let eligible = || residents.iter().filter(|u| u.can_approve_for(flat));
  eligible()
    .find(|u| u.role == Role::Tenant)
    .or_else(|| eligible().find(|u| u.role == Role::Owner))
    .map(|u| u.id)
    .ok_or(WorkflowError::NoResidentFound)
}

/// The approval state a new log starts in, once any approver is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialApproval {
  Required { approver: Uuid },
  Granted(VisitorStatus),
}

/// Assemble the log to persist for a validated create request.
pub fn new_log(
  actor: &Actor,
  input: NewVisitor,
  expected_time: DateTime<Utc>,
  approval: InitialApproval,
  now: DateTime<Utc>,
) -> VisitorLog {
  let (status, is_approved, needs_approval_from) = match approval {
    InitialApproval::Required { approver } => {
      (VisitorStatus::PendingApproval, false, Some(approver))
    }
    InitialApproval::Granted(status) => (status, true, None),
  };

  VisitorLog {
    id: Uuid::new_v4(),
    name: input.name.trim().to_owned(),
    phone: input.phone.trim().to_owned(),
    purpose: input.purpose,
    expected_time,
    flat_to_visit: input.flat_to_visit.trim().to_owned(),
    status,
    is_approved,
    needs_approval_from,
    approved_by: None,
    logged_by: actor.id,
    scheduled_by: actor.id,
    check_in_time: (status == VisitorStatus::CheckedIn).then_some(now),
    check_out_time: None,
    created_at: now,
    updated_at: now,
    revision: 0,
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// The listing `actor` is entitled to.
///
/// `flat_residents` are the owner/tenant records of the actor's flat and are
/// only consulted for residents. Returns `None` for a resident without a
/// flat on record, who can see nothing.
pub fn list_scope(
  actor: &Actor,
  status: Option<VisitorStatus>,
  flat_residents: &[User],
) -> Option<VisitorQuery> {
  let scope = match actor.role {
    Role::Admin | Role::Security | Role::Committee => VisitorScope::All,
    Role::Owner | Role::Tenant => {
      let flat = actor.flat_number.clone()?;
      let counterpart = actor.role.counterpart();
      let mut scheduled_by = vec![actor.id];
      scheduled_by.extend(
        flat_residents
          .iter()
          .filter(|u| Some(u.role) == counterpart && u.id != actor.id)
          .filter(|u| u.flat_number.as_deref() == Some(flat.as_str()))
          .map(|u| u.id),
      );
      VisitorScope::Flat { flat, scheduled_by, awaiting: actor.id }
    }
  };
  Some(VisitorQuery { scope, status })
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Validate `patch` for `actor` and apply it to `log` in place.
///
/// On error `log` may be partially modified and must be discarded.
pub fn apply_update(
  actor: &Actor,
  log: &mut VisitorLog,
  patch: VisitorPatch,
  now: DateTime<Utc>,
) -> Result<()> {
  match actor.role {
    Role::Security => gate_transition(log, patch.status, now)?,
    Role::Owner | Role::Tenant => resident_decision(actor, log, patch, now)?,
    Role::Committee | Role::Admin => correct(actor, log, patch, now)?,
  }
  log.updated_at = now;
  Ok(())
}

fn gate_transition(
  log: &mut VisitorLog,
  status: Option<VisitorStatus>,
  now: DateTime<Utc>,
) -> Result<()> {
  match status {
    Some(VisitorStatus::CheckedIn) => check_in(log, now),
    Some(VisitorStatus::CheckedOut) => check_out(log, now),
    _ => Err(WorkflowError::SecurityCheckInOutOnly),
  }
}

fn resident_decision(
  actor: &Actor,
  log: &mut VisitorLog,
  patch: VisitorPatch,
  now: DateTime<Utc>,
) -> Result<()> {
  if actor.resident_flat() != Some(log.flat_to_visit.as_str()) {
    return Err(WorkflowError::NotOwnFlat);
  }
  let pending = log.status == VisitorStatus::PendingApproval;
  if pending
    && let Some(approver) = log.needs_approval_from
    && approver != actor.id
  {
    return Err(WorkflowError::NotYourTurn);
  }
  let Some(approve) = patch.is_approved else {
    return Err(WorkflowError::ApprovalDecisionRequired);
  };
  // Approval is one-shot: only the pending, assigned resident may decide.
  if !pending || log.needs_approval_from != Some(actor.id) {
    return Err(WorkflowError::NotAwaitingApproval);
  }

  let target = if approve {
    match patch.status {
      None | Some(VisitorStatus::Scheduled) => VisitorStatus::Scheduled,
      Some(VisitorStatus::CheckedIn) => VisitorStatus::CheckedIn,
      Some(other) => return Err(WorkflowError::UnsupportedStatus(other.into())),
    }
  } else {
    VisitorStatus::Rejected
  };

  decide(log, actor.id, approve);
  if target == VisitorStatus::CheckedIn {
    check_in(log, now)?;
  }
  Ok(())
}

fn correct(
  actor: &Actor,
  log: &mut VisitorLog,
  patch: VisitorPatch,
  now: DateTime<Utc>,
) -> Result<()> {
  if let Some(name) = patch.name {
    log.name = non_blank(name, "name")?;
  }
  if let Some(phone) = patch.phone {
    log.phone = non_blank(phone, "phone")?;
  }
  if let Some(purpose) = patch.purpose {
    log.purpose = Some(purpose);
  }
  if let Some(expected_time) = patch.expected_time {
    log.expected_time = expected_time;
  }
  if let Some(flat) = patch.flat_to_visit {
    let flat = non_blank(flat, "flatToVisit")?;
    // The assigned approver belongs to the old flat.
    if flat != log.flat_to_visit
      && log.status == VisitorStatus::PendingApproval
      && patch.status.is_none()
      && patch.is_approved.is_none()
    {
      return Err(WorkflowError::PendingFlatChange);
    }
    log.flat_to_visit = flat;
  }

  // An explicit status wins over a bare approval flag.
  match (patch.status, patch.is_approved) {
    (Some(VisitorStatus::Scheduled), _) => override_decision(log, actor.id, true)?,
    (Some(VisitorStatus::Rejected), _) => override_decision(log, actor.id, false)?,
    (Some(VisitorStatus::CheckedIn), _) => check_in(log, now)?,
    (Some(VisitorStatus::CheckedOut), _) => check_out(log, now)?,
    (Some(s @ VisitorStatus::PendingApproval), _) => {
      return Err(WorkflowError::UnsupportedStatus(s.into()));
    }
    (None, Some(approve)) => override_decision(log, actor.id, approve)?,
    (None, None) => {}
  }
  Ok(())
}

/// A staff decision. Only logs that have not reached the gate yet can be
/// re-decided; a visit that happened keeps its timestamps.
fn override_decision(log: &mut VisitorLog, by: Uuid, approve: bool) -> Result<()> {
  match log.status {
    VisitorStatus::CheckedIn | VisitorStatus::CheckedOut => {
      Err(WorkflowError::VisitAlreadyStarted)
    }
    VisitorStatus::Scheduled
    | VisitorStatus::PendingApproval
    | VisitorStatus::Rejected => {
      decide(log, by, approve);
      Ok(())
    }
  }
}

/// Record an approval decision and close out any pending assignment.
fn decide(log: &mut VisitorLog, by: Uuid, approve: bool) {
  log.is_approved = approve;
  log.approved_by = Some(by);
  log.needs_approval_from = None;
  log.status = if approve {
    VisitorStatus::Scheduled
  } else {
    VisitorStatus::Rejected
  };
}

fn check_in(log: &mut VisitorLog, now: DateTime<Utc>) -> Result<()> {
  match log.status {
    VisitorStatus::PendingApproval => Err(WorkflowError::AwaitingApproval),
    VisitorStatus::Rejected => Err(WorkflowError::VisitorRejected),
    VisitorStatus::CheckedIn => Err(WorkflowError::AlreadyCheckedIn),
    // A checked-out visitor may come back; the new visit starts clean.
    VisitorStatus::Scheduled | VisitorStatus::CheckedOut => {
      log.status = VisitorStatus::CheckedIn;
      log.check_in_time = Some(now);
      log.check_out_time = None;
      Ok(())
    }
  }
}

fn check_out(log: &mut VisitorLog, now: DateTime<Utc>) -> Result<()> {
  if log.status != VisitorStatus::CheckedIn {
    return Err(WorkflowError::NotCheckedIn);
  }
  log.status = VisitorStatus::CheckedOut;
  log.check_out_time = Some(now);
  Ok(())
}

fn non_blank(value: String, field: &'static str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    Err(WorkflowError::MissingField(field))
  } else {
    Ok(trimmed.to_owned())
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// Committee and admin may delete any log; anyone else only their own.
pub fn authorize_delete(actor: &Actor, log: &VisitorLog) -> Result<()> {
  match actor.role {
    Role::Committee | Role::Admin => Ok(()),
    Role::Owner | Role::Tenant | Role::Security => {
      if log.logged_by == actor.id {
        Ok(())
      } else {
        Err(WorkflowError::DeleteNotPermitted)
      }
    }
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Only committee and admin manage member accounts.
pub fn authorize_account_admin(actor: &Actor) -> Result<()> {
  match actor.role {
    Role::Committee | Role::Admin => Ok(()),
    Role::Owner | Role::Tenant | Role::Security => {
      Err(WorkflowError::AccountAdminOnly)
    }
  }
}

/// Apply an approval/activation change from `actor` to `user`.
pub fn apply_account_patch(
  actor: &Actor,
  user: &mut User,
  patch: AccountPatch,
) -> Result<()> {
  authorize_account_admin(actor)?;
  if patch.is_approved.is_none() && patch.is_active.is_none() {
    return Err(WorkflowError::MissingField("isApproved or isActive"));
  }
  if user.id == actor.id {
    return Err(WorkflowError::OwnAccount);
  }
  if let Some(approved) = patch.is_approved {
    user.is_approved = approved;
  }
  if let Some(active) = patch.is_active {
    user.is_active = active;
  }
  Ok(())
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Staff may look up any flat's approvers; residents only their own.
pub fn authorize_directory(actor: &Actor, flat: &str) -> Result<()> {
  match actor.role {
    Role::Security | Role::Committee | Role::Admin => Ok(()),
    Role::Owner | Role::Tenant => {
      if actor.resident_flat() == Some(flat) {
        Ok(())
      } else {
        Err(WorkflowError::ForeignFlat)
      }
    }
  }
}
