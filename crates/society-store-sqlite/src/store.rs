//! [`SqliteStore`], the SQLite implementation of [`SocietyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use society_core::{
  store::SocietyStore,
  user::{NewUser, PersonRef, User},
  visitor::{VisitorLog, VisitorQuery, VisitorScope},
};

use crate::{
  Error, Result,
  encode::{
    RawPerson, RawUser, RawVisitor, USER_COLUMNS, VISITOR_COLUMNS, encode_dt,
    encode_revision, encode_role, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Society Connect store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Drop sessions that expired before `now`. Returns how many were removed.
  pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(removed)
  }
}

/// `?1, ?2, ...` starting at `start`.
fn placeholders(start: usize, count: usize) -> String {
  (start..start + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Build the WHERE clause and positional parameters for a visitor listing.
fn visitor_filter(query: &VisitorQuery) -> (String, Vec<String>) {
  let mut conds: Vec<String> = vec![];
  let mut params: Vec<String> = vec![];

  if let VisitorScope::Flat { flat, scheduled_by, awaiting } = &query.scope {
    params.push(flat.clone());
    conds.push(format!("flat_to_visit = ?{}", params.len()));

    let first = params.len() + 1;
    params.extend(scheduled_by.iter().copied().map(encode_uuid));
    params.push(encode_uuid(*awaiting));
    let awaiting_idx = params.len();

    if scheduled_by.is_empty() {
      conds.push(format!("needs_approval_from = ?{awaiting_idx}"));
    } else {
      conds.push(format!(
        "(scheduled_by IN ({}) OR needs_approval_from = ?{awaiting_idx})",
        placeholders(first, scheduled_by.len()),
      ));
    }
  }

  if let Some(status) = query.status {
    params.push(encode_status(status).to_owned());
    conds.push(format!("status = ?{}", params.len()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, params)
}

// ─── SocietyStore impl ───────────────────────────────────────────────────────

impl SocietyStore for SqliteStore {
  type Error = Error;

  // ── User directory ────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      id:            Uuid::new_v4(),
      first_name:    input.first_name,
      last_name:     input.last_name,
      email:         input.email.trim().to_owned(),
      role:          input.role,
      flat_number:   input.flat_number,
      is_active:     input.is_active,
      is_approved:   input.is_approved,
      password_hash: input.password_hash,
      created_at:    Utc::now(),
    };

    let id_str     = encode_uuid(user.id);
    let first_name = user.first_name.clone();
    let last_name  = user.last_name.clone();
    let email      = user.email.clone();
    let role_str   = encode_role(user.role);
    let flat       = user.flat_number.clone();
    let is_active  = user.is_active;
    let approved   = user.is_approved;
    let hash       = user.password_hash.clone();
    let at_str     = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (
             user_id, first_name, last_name, email, role, flat_number,
             is_active, is_approved, password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str, first_name, last_name, email, role_str, flat, is_active,
            approved, hash, at_str,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateEmail(user.email));
    }
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn residents_of_flat(&self, flat: &str) -> Result<Vec<User>> {
    let flat = flat.to_owned();

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE flat_number = ?1 AND role IN ('owner', 'tenant')
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![flat], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn people(&self, ids: &[Uuid]) -> Result<Vec<PersonRef>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT user_id, first_name, last_name, role FROM users
           WHERE user_id IN ({})",
          placeholders(1, id_strs.len()),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), |row| {
            Ok(RawPerson {
              user_id:    row.get(0)?,
              first_name: row.get(1)?,
              last_name:  row.get(2)?,
              role:       row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn list_users(&self, approved: Option<bool>) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE ?1 IS NULL OR is_approved = ?1
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![approved], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_account_status(
    &self,
    id:          Uuid,
    is_approved: bool,
    is_active:   bool,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_approved = ?2, is_active = ?3 WHERE user_id = ?1",
          rusqlite::params![id_str, is_approved, is_active],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(
    &self,
    token_hash: String,
    user_id:    Uuid,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let user_str    = encode_uuid(user_id);
    let created_str = encode_dt(Utc::now());
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, user_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_session(
    &self,
    token_hash: &str,
    now:        DateTime<Utc>,
  ) -> Result<Option<User>> {
    let token_hash = token_hash.to_owned();
    let now_str    = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS} FROM users WHERE user_id = (
                 SELECT user_id FROM sessions
                 WHERE token_hash = ?1 AND expires_at > ?2
               )"
            ),
            rusqlite::params![token_hash, now_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<bool> {
    let token_hash = token_hash.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Visitor logs ──────────────────────────────────────────────────────────

  async fn insert_visitor(&self, log: &VisitorLog) -> Result<()> {
    let id_str        = encode_uuid(log.id);
    let name          = log.name.clone();
    let phone         = log.phone.clone();
    let purpose       = log.purpose.clone();
    let expected_str  = encode_dt(log.expected_time);
    let flat          = log.flat_to_visit.clone();
    let status_str    = encode_status(log.status);
    let is_approved   = log.is_approved;
    let needs_str     = log.needs_approval_from.map(encode_uuid);
    let approved_str  = log.approved_by.map(encode_uuid);
    let logged_str    = encode_uuid(log.logged_by);
    let scheduled_str = encode_uuid(log.scheduled_by);
    let check_in_str  = log.check_in_time.map(encode_dt);
    let check_out_str = log.check_out_time.map(encode_dt);
    let created_str   = encode_dt(log.created_at);
    let updated_str   = encode_dt(log.updated_at);
    let revision      = encode_revision(log.revision);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO visitor_logs ({VISITOR_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17)"
          ),
          rusqlite::params![
            id_str,
            name,
            phone,
            purpose,
            expected_str,
            flat,
            status_str,
            is_approved,
            needs_str,
            approved_str,
            logged_str,
            scheduled_str,
            check_in_str,
            check_out_str,
            created_str,
            updated_str,
            revision,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_visitor(&self, id: Uuid) -> Result<Option<VisitorLog>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawVisitor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {VISITOR_COLUMNS} FROM visitor_logs WHERE visitor_id = ?1"),
            rusqlite::params![id_str],
            RawVisitor::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVisitor::into_log).transpose()
  }

  async fn list_visitors(&self, query: &VisitorQuery) -> Result<Vec<VisitorLog>> {
    let (where_clause, params) = visitor_filter(query);

    let raws: Vec<RawVisitor> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VISITOR_COLUMNS} FROM visitor_logs
           {where_clause}
           ORDER BY expected_time DESC, created_at DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawVisitor::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisitor::into_log).collect()
  }

  async fn update_visitor(
    &self,
    log:               &VisitorLog,
    expected_revision: u64,
  ) -> Result<bool> {
    let id_str        = encode_uuid(log.id);
    let name          = log.name.clone();
    let phone         = log.phone.clone();
    let purpose       = log.purpose.clone();
    let expected_str  = encode_dt(log.expected_time);
    let flat          = log.flat_to_visit.clone();
    let status_str    = encode_status(log.status);
    let is_approved   = log.is_approved;
    let needs_str     = log.needs_approval_from.map(encode_uuid);
    let approved_str  = log.approved_by.map(encode_uuid);
    let check_in_str  = log.check_in_time.map(encode_dt);
    let check_out_str = log.check_out_time.map(encode_dt);
    let updated_str   = encode_dt(log.updated_at);
    let read_rev      = encode_revision(expected_revision);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE visitor_logs SET
             name = ?2, phone = ?3, purpose = ?4, expected_time = ?5,
             flat_to_visit = ?6, status = ?7, is_approved = ?8,
             needs_approval_from = ?9, approved_by = ?10,
             check_in_time = ?11, check_out_time = ?12, updated_at = ?13,
             revision = revision + 1
           WHERE visitor_id = ?1 AND revision = ?14",
          rusqlite::params![
            id_str,
            name,
            phone,
            purpose,
            expected_str,
            flat,
            status_str,
            is_approved,
            needs_str,
            approved_str,
            check_in_str,
            check_out_str,
            updated_str,
            read_rev,
          ],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn delete_visitor(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM visitor_logs WHERE visitor_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
