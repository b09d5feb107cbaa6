//! Principal roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a principal acts under.
///
/// A closed set: every authorization check matches on all four variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Uploads content and decides who may read it.
    Owner,
    /// Read-only delegate of an owner.
    Keyholder,
    /// Operator with upload rights; reads only through grants like anyone else.
    Admin,
    /// Unauthenticated caller.
    Anonymous,
}

impl Role {
    /// Whether this role may upload new content.
    pub fn can_upload(self) -> bool {
        match self {
            Role::Owner | Role::Admin => true,
            Role::Keyholder | Role::Anonymous => false,
        }
    }

    /// Whether a grant may be issued to a principal with this role.
    pub fn can_hold_grant(self) -> bool {
        match self {
            Role::Owner | Role::Keyholder | Role::Admin => true,
            Role::Anonymous => false,
        }
    }

    /// Stable lowercase name, used in audit metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Keyholder => "keyholder",
            Role::Admin => "admin",
            Role::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
