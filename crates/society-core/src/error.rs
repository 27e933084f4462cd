//! Error types for `society-core`.

use thiserror::Error;
use uuid::Uuid;

/// Broad classification of a failure, used by transport layers to pick a
/// status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  Forbidden,
  NotFound,
  Conflict,
}

/// A request rejected by the visitor workflow. Every variant carries a
/// human-readable reason through its `Display` impl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("Invalid approver selected")]
  InvalidApprover,

  #[error("No active resident found for this flat to approve the visitor")]
  NoResidentFound,

  #[error("This visitor is waiting for approval from another resident")]
  NotYourTurn,

  #[error("This visitor is not awaiting your approval")]
  NotAwaitingApproval,

  #[error("You can only approve or reject visitors")]
  ApprovalDecisionRequired,

  #[error("You can only approve visitors for your flat")]
  NotOwnFlat,

  #[error("You can only view residents of your own flat")]
  ForeignFlat,

  #[error("Security can only check in/out visitors")]
  SecurityCheckInOutOnly,

  #[error("Cannot check in visitor. Waiting for resident approval.")]
  AwaitingApproval,

  #[error("Cannot check in rejected visitor.")]
  VisitorRejected,

  #[error("Cannot check out a visitor who is not checked in")]
  NotCheckedIn,

  #[error("Visitor is already checked in")]
  AlreadyCheckedIn,

  #[error("The approval of a visitor who has already checked in cannot be changed")]
  VisitAlreadyStarted,

  #[error("Only committee members and admins can manage accounts")]
  AccountAdminOnly,

  #[error("You cannot change the status of your own account")]
  OwnAccount,

  #[error("status {0} cannot be set by this operation")]
  UnsupportedStatus(&'static str),

  #[error("A visitor awaiting approval cannot be moved to another flat")]
  PendingFlatChange,

  #[error("You cannot delete this visitor record")]
  DeleteNotPermitted,

  #[error("Visitor record not found")]
  VisitorNotFound(Uuid),

  #[error("User not found")]
  UserNotFound(Uuid),

  #[error("Visitor record was modified concurrently; reload and retry")]
  Conflict(Uuid),
}

impl WorkflowError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::MissingField(_)
      | Self::InvalidApprover
      | Self::NoResidentFound
      | Self::UnsupportedStatus(_)
      | Self::PendingFlatChange => ErrorKind::Validation,
      Self::NotYourTurn
      | Self::NotAwaitingApproval
      | Self::ApprovalDecisionRequired
      | Self::NotOwnFlat
      | Self::ForeignFlat
      | Self::SecurityCheckInOutOnly
      | Self::AwaitingApproval
      | Self::VisitorRejected
      | Self::NotCheckedIn
      | Self::AlreadyCheckedIn
      | Self::VisitAlreadyStarted
      | Self::AccountAdminOnly
      | Self::OwnAccount
      | Self::DeleteNotPermitted => ErrorKind::Forbidden,
      Self::VisitorNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
    }
  }
}

/// Decoding errors for values that cross a storage or wire boundary.
#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown visitor status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
