//! Directory entries for society members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::{Actor, Role};

/// A member of the society as stored in the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            Uuid,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          Role,
  pub flat_number:   Option<String>,
  pub is_active:     bool,
  /// Set once the committee has approved the sign-up.
  pub is_approved:   bool,
  /// Argon2 PHC string; never leaves the server.
  #[serde(skip)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

impl User {
  /// Whether this user can approve visitors for `flat`.
  pub fn can_approve_for(&self, flat: &str) -> bool {
    self.role.is_resident()
      && self.is_active
      && self.is_approved
      && self.flat_number.as_deref() == Some(flat)
  }

  pub fn actor(&self) -> Actor {
    Actor {
      id:          self.id,
      role:        self.role,
      flat_number: self.flat_number.clone(),
    }
  }

  pub fn person_ref(&self) -> PersonRef {
    PersonRef {
      id:         self.id,
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
      role:       self.role,
    }
  }
}

/// Input to [`crate::store::SocietyStore::add_user`].
/// `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub role:          Role,
  pub flat_number:   Option<String>,
  pub is_active:     bool,
  pub is_approved:   bool,
  pub password_hash: String,
}

/// A populated reference to a user, embedded in visitor responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
  pub id:         Uuid,
  pub first_name: String,
  pub last_name:  String,
  pub role:       Role,
}

/// Body of an account status change. At least one flag must be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
  pub is_approved: Option<bool>,
  pub is_active:   Option<bool>,
}
