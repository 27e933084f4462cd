//! Roles and the authenticated actor.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// Every role a Society Connect account can hold.
///
/// Workflow rules match on this exhaustively, so adding a role forces each
/// operation to decide what the new role may do.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Owner,
  Tenant,
  Committee,
  Admin,
  Security,
}

impl Role {
  /// Owners and tenants are residents of a flat.
  pub fn is_resident(self) -> bool { matches!(self, Self::Owner | Self::Tenant) }

  /// The other resident type on the same flat: owner for a tenant and vice
  /// versa. `None` for non-resident roles.
  pub fn counterpart(self) -> Option<Role> {
    match self {
      Self::Owner => Some(Self::Tenant),
      Self::Tenant => Some(Self::Owner),
      Self::Committee | Self::Admin | Self::Security => None,
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownRole(s.to_owned()))
  }
}

/// The caller of an operation, as resolved by authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
  pub id:          Uuid,
  pub role:        Role,
  pub flat_number: Option<String>,
}

impl Actor {
  /// The actor's flat, if they are a resident with one on record.
  pub fn resident_flat(&self) -> Option<&str> {
    if self.role.is_resident() {
      self.flat_number.as_deref()
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_strings_are_lowercase() {
    assert_eq!(Role::Security.as_ref(), "security");
    assert_eq!(Role::parse("tenant").unwrap(), Role::Tenant);
    assert!(matches!(Role::parse("janitor"), Err(Error::UnknownRole(_))));
  }

  #[test]
  fn counterparts_pair_residents() {
    assert_eq!(Role::Owner.counterpart(), Some(Role::Tenant));
    assert_eq!(Role::Tenant.counterpart(), Some(Role::Owner));
    assert_eq!(Role::Admin.counterpart(), None);
  }
}
