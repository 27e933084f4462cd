//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond precision
//! and a `Z` suffix, so string order equals time order. UUIDs are stored as
//! hyphenated lowercase strings. Roles and statuses use their wire names.

use chrono::{DateTime, SecondsFormat, Utc};
use society_core::{
  role::Role,
  user::{PersonRef, User},
  visitor::{VisitorLog, VisitorStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Role / VisitorStatus ─────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str { r.into() }

pub fn encode_status(s: VisitorStatus) -> &'static str { s.into() }

// ─── Revision ─────────────────────────────────────────────────────────────────

/// SQLite integers are signed; revisions never get near the boundary.
pub fn encode_revision(r: u64) -> i64 { i64::try_from(r).unwrap_or(i64::MAX) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, first_name, last_name, email, role, \
                                flat_number, is_active, is_approved, \
                                password_hash, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          String,
  pub flat_number:   Option<String>,
  pub is_active:     bool,
  pub is_approved:   bool,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`] (optionally table-qualified).
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      first_name:    row.get(1)?,
      last_name:     row.get(2)?,
      email:         row.get(3)?,
      role:          row.get(4)?,
      flat_number:   row.get(5)?,
      is_active:     row.get(6)?,
      is_approved:   row.get(7)?,
      password_hash: row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_uuid(&self.user_id)?,
      first_name:    self.first_name,
      last_name:     self.last_name,
      email:         self.email,
      role:          Role::parse(&self.role)?,
      flat_number:   self.flat_number,
      is_active:     self.is_active,
      is_approved:   self.is_approved,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from the `user_id, first_name, last_name, role` columns.
pub struct RawPerson {
  pub user_id:    String,
  pub first_name: String,
  pub last_name:  String,
  pub role:       String,
}

impl RawPerson {
  pub fn into_person(self) -> Result<PersonRef> {
    Ok(PersonRef {
      id:         decode_uuid(&self.user_id)?,
      first_name: self.first_name,
      last_name:  self.last_name,
      role:       Role::parse(&self.role)?,
    })
  }
}

pub const VISITOR_COLUMNS: &str = "visitor_id, name, phone, purpose, \
                                   expected_time, flat_to_visit, status, \
                                   is_approved, needs_approval_from, \
                                   approved_by, logged_by, scheduled_by, \
                                   check_in_time, check_out_time, \
                                   created_at, updated_at, revision";

/// Raw values read directly from a `visitor_logs` row.
pub struct RawVisitor {
  pub visitor_id:          String,
  pub name:                String,
  pub phone:               String,
  pub purpose:             Option<String>,
  pub expected_time:       String,
  pub flat_to_visit:       String,
  pub status:              String,
  pub is_approved:         bool,
  pub needs_approval_from: Option<String>,
  pub approved_by:         Option<String>,
  pub logged_by:           String,
  pub scheduled_by:        String,
  pub check_in_time:       Option<String>,
  pub check_out_time:      Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
  pub revision:            i64,
}

impl RawVisitor {
  /// Read a row selected with [`VISITOR_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visitor_id:          row.get(0)?,
      name:                row.get(1)?,
      phone:               row.get(2)?,
      purpose:             row.get(3)?,
      expected_time:       row.get(4)?,
      flat_to_visit:       row.get(5)?,
      status:              row.get(6)?,
      is_approved:         row.get(7)?,
      needs_approval_from: row.get(8)?,
      approved_by:         row.get(9)?,
      logged_by:           row.get(10)?,
      scheduled_by:        row.get(11)?,
      check_in_time:       row.get(12)?,
      check_out_time:      row.get(13)?,
      created_at:          row.get(14)?,
      updated_at:          row.get(15)?,
      revision:            row.get(16)?,
    })
  }

  pub fn into_log(self) -> Result<VisitorLog> {
    Ok(VisitorLog {
      id:                  decode_uuid(&self.visitor_id)?,
      name:                self.name,
      phone:               self.phone,
      purpose:             self.purpose,
      expected_time:       decode_dt(&self.expected_time)?,
      flat_to_visit:       self.flat_to_visit,
      status:              VisitorStatus::parse(&self.status)?,
      is_approved:         self.is_approved,
      needs_approval_from: decode_opt_uuid(self.needs_approval_from)?,
      approved_by:         decode_opt_uuid(self.approved_by)?,
      logged_by:           decode_uuid(&self.logged_by)?,
      scheduled_by:        decode_uuid(&self.scheduled_by)?,
      check_in_time:       decode_opt_dt(self.check_in_time)?,
      check_out_time:      decode_opt_dt(self.check_out_time)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
      revision:            u64::try_from(self.revision).unwrap_or_default(),
    })
  }
}
