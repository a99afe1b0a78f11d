//! # Access Control
//!
//! Capability checks at the boundary between the presentation layer and
//! the core.
//!
//! The identity provider is an external collaborator: it authenticates
//! and hands us a `(user_id, role)` pair per request, which we trust.
//! Role checks happen here, at the boundary, never inside business logic.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Role;

/// The authenticated actor for one request, as supplied by the identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }

    /// Gate for catalog management, user management, and reporting.
    pub fn require_admin(&self) -> CoreResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                required: "administrator",
            })
        }
    }

    /// Gate for cart and checkout operations.
    pub fn require_staff(&self) -> CoreResult<()> {
        if self.role == Role::Staff {
            Ok(())
        } else {
            Err(CoreError::Unauthorized { required: "cashier" })
        }
    }
}
