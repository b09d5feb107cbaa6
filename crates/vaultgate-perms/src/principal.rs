//! Principals as seen by the access layer.

use serde::{Deserialize, Serialize};

use vaultgate_core::{PrincipalId, Role};

use crate::crypto::X25519PublicKey;

/// A caller or recipient: identity, role and key-agreement public key.
///
/// Anonymous callers carry no public key and can never receive a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub public_key: Option<X25519PublicKey>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role, public_key: X25519PublicKey) -> Self {
        Self {
            id: PrincipalId::new(id),
            role,
            public_key: Some(public_key),
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self {
            id: PrincipalId::new("anonymous"),
            role: Role::Anonymous,
            public_key: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.role == Role::Anonymous
    }
}
