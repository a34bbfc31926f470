//! Realm and client role references.
//!
//! # Purpose
//! Mapper configuration encodes roles as `"<roleName>"` for realm roles and
//! `"<clientId>.<roleName>"` for client roles. `RoleRef` is the parsed,
//! tagged form so nothing downstream has to guess which one a string meant.
//!
//! # Key invariants
//! - The prefix before the first `.` is only treated as a client id when the
//!   caller confirms that client exists; otherwise the whole string is a
//!   realm role name (realm role names may contain dots).
//! - `encode` is the inverse of `parse` for any reference produced by it.
//!
//! # Examples
//! ```rust
//! use mapper_claims::{RoleRef, RoleScope};
//!
//! let role = RoleRef::parse("account.view-profile", |client| client == "account").unwrap();
//! assert_eq!(role.scope, RoleScope::Client { client_id: "account".to_string() });
//! assert_eq!(role.name, "view-profile");
//! ```
use crate::{ClaimError, ClaimPath, ClaimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RoleScope {
    Realm,
    Client { client_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleRef {
    #[serde(flatten)]
    pub scope: RoleScope,
    pub name: String,
}

impl RoleRef {
    pub fn realm(name: impl Into<String>) -> Self {
        Self {
            scope: RoleScope::Realm,
            name: name.into(),
        }
    }

    pub fn client(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: RoleScope::Client {
                client_id: client_id.into(),
            },
            name: name.into(),
        }
    }

    /// Parse the `role` / `client.role` encoding.
    ///
    /// `is_client` decides whether the prefix before the first dot names an
    /// existing client.
    ///
    /// # Errors
    /// - [`ClaimError::InvalidRoleReference`] for empty input, or an empty role
    ///   name after a client prefix.
    pub fn parse(encoded: &str, is_client: impl Fn(&str) -> bool) -> ClaimResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(ClaimError::InvalidRoleReference(encoded.to_string()));
        }
        if let Some((client_id, name)) = encoded.split_once('.') {
            if !client_id.is_empty() && is_client(client_id) {
                if name.is_empty() {
                    return Err(ClaimError::InvalidRoleReference(encoded.to_string()));
                }
                return Ok(Self::client(client_id, name));
            }
        }
        Ok(Self::realm(encoded))
    }

    pub fn client_id(&self) -> Option<&str> {
        match &self.scope {
            RoleScope::Realm => None,
            RoleScope::Client { client_id } => Some(client_id),
        }
    }

    pub fn encode(&self) -> String {
        match &self.scope {
            RoleScope::Realm => self.name.clone(),
            RoleScope::Client { client_id } => format!("{client_id}.{}", self.name),
        }
    }

    /// Token claim path under which this role is listed.
    ///
    /// Realm roles live in `realm_access.roles`; client roles in
    /// `resource_access.<client>.roles`.
    pub fn claim_path(&self) -> ClaimPath {
        let segments = match &self.scope {
            RoleScope::Realm => vec!["realm_access".to_string(), "roles".to_string()],
            RoleScope::Client { client_id } => vec![
                "resource_access".to_string(),
                client_id.clone(),
                "roles".to_string(),
            ],
        };
        ClaimPath::from_parts(segments)
    }
}

impl std::fmt::Display for RoleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_only(client: &str) -> bool {
        client == "account"
    }

    #[test]
    fn parse_realm_role() {
        let role = RoleRef::parse("offline_access", account_only).expect("realm role");
        assert_eq!(role, RoleRef::realm("offline_access"));
        assert_eq!(role.client_id(), None);
    }

    #[test]
    fn parse_client_role() {
        let role = RoleRef::parse("account.view-profile", account_only).expect("client role");
        assert_eq!(role, RoleRef::client("account", "view-profile"));
        assert_eq!(role.encode(), "account.view-profile");
    }

    #[test]
    fn dotted_realm_role_when_prefix_is_not_a_client() {
        let role = RoleRef::parse("team.lead", account_only).expect("realm role");
        assert_eq!(role, RoleRef::realm("team.lead"));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(RoleRef::parse("", account_only).is_err());
        assert!(RoleRef::parse("   ", account_only).is_err());
        assert!(RoleRef::parse("account.", account_only).is_err());
    }

    #[test]
    fn claim_paths_follow_scope() {
        assert_eq!(
            RoleRef::realm("offline_access").claim_path().to_string(),
            "realm_access.roles"
        );
        assert_eq!(
            RoleRef::client("account", "view-profile")
                .claim_path()
                .segments(),
            ["resource_access", "account", "roles"]
        );
    }
}
