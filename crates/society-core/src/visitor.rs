//! Visitor logs: the scheduled or walk-in visits a flat receives.
//!
//! A log moves through [`VisitorStatus`] values under the rules in
//! [`crate::workflow`]. The populated read model returned to clients is
//! [`VisitorView`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, user::PersonRef};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisitorStatus {
  Scheduled,
  PendingApproval,
  Rejected,
  CheckedIn,
  CheckedOut,
}

impl VisitorStatus {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// A persisted visitor log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorLog {
  pub id:                  Uuid,
  pub name:                String,
  pub phone:               String,
  pub purpose:             Option<String>,
  pub expected_time:       DateTime<Utc>,
  /// Free-form flat code, e.g. `"A-101"`.
  pub flat_to_visit:       String,

  pub status:              VisitorStatus,
  pub is_approved:         bool,
  /// Set only while `status` is [`VisitorStatus::PendingApproval`].
  pub needs_approval_from: Option<Uuid>,
  pub approved_by:         Option<Uuid>,
  pub logged_by:           Uuid,
  pub scheduled_by:        Uuid,
  pub check_in_time:       Option<DateTime<Utc>>,
  pub check_out_time:      Option<DateTime<Utc>>,

  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  /// Bumped on every write; updates are conditional on the value read.
  pub revision:            u64,
}

/// A [`VisitorLog`] with its user references resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorView {
  pub id:                  Uuid,
  pub name:                String,
  pub phone:               String,
  pub purpose:             Option<String>,
  pub expected_time:       DateTime<Utc>,
  pub flat_to_visit:       String,
  pub status:              VisitorStatus,
  pub is_approved:         bool,
  pub needs_approval_from: Option<PersonRef>,
  pub approved_by:         Option<PersonRef>,
  pub logged_by:           Option<PersonRef>,
  pub scheduled_by:        Option<PersonRef>,
  pub check_in_time:       Option<DateTime<Utc>>,
  pub check_out_time:      Option<DateTime<Utc>>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  pub revision:            u64,
}

impl VisitorView {
  /// Build a view, resolving references with `lookup`. References to users
  /// that no longer exist come back as `None`.
  pub fn populate(
    log: VisitorLog,
    lookup: impl Fn(Uuid) -> Option<PersonRef>,
  ) -> Self {
    Self {
      needs_approval_from: log.needs_approval_from.and_then(&lookup),
      approved_by:         log.approved_by.and_then(&lookup),
      logged_by:           lookup(log.logged_by),
      scheduled_by:        lookup(log.scheduled_by),
      id:                  log.id,
      name:                log.name,
      phone:               log.phone,
      purpose:             log.purpose,
      expected_time:       log.expected_time,
      flat_to_visit:       log.flat_to_visit,
      status:              log.status,
      is_approved:         log.is_approved,
      check_in_time:       log.check_in_time,
      check_out_time:      log.check_out_time,
      created_at:          log.created_at,
      updated_at:          log.updated_at,
      revision:            log.revision,
    }
  }
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitor {
  #[serde(default)]
  pub name:                String,
  #[serde(default)]
  pub phone:               String,
  pub purpose:             Option<String>,
  pub expected_time:       Option<DateTime<Utc>>,
  #[serde(default)]
  pub flat_to_visit:       String,
  /// Only honoured for security staff; see
  /// [`crate::workflow::plan_creation`].
  pub status:              Option<VisitorStatus>,
  /// Explicit approver chosen by security. Blank strings count as absent.
  pub needs_approval_from: Option<String>,
}

/// Body of an update request. Which fields an actor may supply depends on
/// their role.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorPatch {
  pub name:          Option<String>,
  pub phone:         Option<String>,
  pub purpose:       Option<String>,
  pub expected_time: Option<DateTime<Utc>>,
  pub flat_to_visit: Option<String>,
  pub status:        Option<VisitorStatus>,
  pub is_approved:   Option<bool>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Which logs a listing may include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitorScope {
  All,
  /// Logs for `flat` that were scheduled by one of `scheduled_by`, or that
  /// await a decision from `awaiting`.
  Flat {
    flat:         String,
    scheduled_by: Vec<Uuid>,
    awaiting:     Uuid,
  },
}

/// Parameters for [`crate::store::SocietyStore::list_visitors`]. Results are
/// always ordered by expected time, latest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorQuery {
  pub scope:  VisitorScope,
  pub status: Option<VisitorStatus>,
}
