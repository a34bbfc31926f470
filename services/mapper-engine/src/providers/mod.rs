//! Read-only identity data providers consumed by the mapper engine.
//!
//! # Purpose
//! Defines the principal/session handles passed into claim assembly and the
//! two provider seams the engine reads from:
//! - [`IdentityProvider`]: per-request user, session, role, and group data.
//!   Implementations may perform I/O, so the methods are async.
//! - [`RoleCatalog`]: realm and client role definitions, consulted
//!   synchronously by validation to resolve role references.
//!
//! # Key invariants
//! - The engine never mutates provider data; no write methods exist.
//! - Provider failures are reported as `anyhow::Error` and degrade to
//!   per-mapper warnings during issuance.
pub mod memory;

use async_trait::async_trait;
use mapper_claims::{ClaimResult, RoleRef};
use serde::{Deserialize, Serialize};

/// Authenticated user a token is being issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
}

/// User session the token is issued within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub session_id: String,
    pub user_id: String,
}

/// Group membership, identified by its full `/parent/child` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRef {
    path: String,
}

impl GroupRef {
    pub fn new(path: impl AsRef<str>) -> Self {
        let trimmed = path.as_ref().trim_matches('/');
        Self {
            path: format!("/{trimmed}"),
        }
    }

    pub fn full_path(&self) -> &str {
        &self.path
    }

    /// Leaf group name (last path segment).
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// All values of a user attribute, in stored order; empty when absent.
    async fn user_attribute(&self, principal: &Principal, key: &str) -> anyhow::Result<Vec<String>>;

    /// A bean-style user property such as `email` or `firstName`.
    async fn user_property(
        &self,
        principal: &Principal,
        property: &str,
    ) -> anyhow::Result<Option<String>>;

    async fn session_note(&self, session: &UserSession, key: &str)
    -> anyhow::Result<Option<String>>;

    async fn effective_roles(&self, principal: &Principal) -> anyhow::Result<Vec<RoleRef>>;

    async fn group_memberships(&self, principal: &Principal) -> anyhow::Result<Vec<GroupRef>>;
}

pub trait RoleCatalog: Send + Sync {
    fn client_exists(&self, client_id: &str) -> bool;

    fn role_exists(&self, role: &RoleRef) -> bool;

    /// Parse a `role` / `client.role` string against the known clients.
    fn parse_role(&self, encoded: &str) -> ClaimResult<RoleRef> {
        RoleRef::parse(encoded, |client_id| self.client_exists(client_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ref_normalizes_paths() {
        let group = GroupRef::new("engineering/platform/");
        assert_eq!(group.full_path(), "/engineering/platform");
        assert_eq!(group.name(), "platform");

        let top = GroupRef::new("/admins");
        assert_eq!(top.full_path(), "/admins");
        assert_eq!(top.name(), "admins");
    }
}
