//! In-memory realm data implementing both provider seams.
//!
//! # Purpose
//! Holds realm roles, client roles, users, and sessions in plain maps. It backs
//! local runs (loaded from the seed document) and tests.
//!
//! # Notes
//! The data is immutable once built; share it behind an `Arc`.
use super::{GroupRef, IdentityProvider, Principal, RoleCatalog, UserSession};
use async_trait::async_trait;
use mapper_claims::{RoleRef, RoleScope};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Role assignments in `role` / `client.role` encoding.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Group paths such as `/engineering/platform`.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id.clone(),
            username: self.username.clone(),
        }
    }

    fn property(&self, property: &str) -> Option<String> {
        match property.to_ascii_lowercase().as_str() {
            "id" => Some(self.id.clone()),
            "username" => Some(self.username.clone()),
            "email" => self.email.clone(),
            "emailverified" => Some(self.email_verified.to_string()),
            "firstname" => self.first_name.clone(),
            "lastname" => self.last_name.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

impl SessionRecord {
    pub fn session(&self) -> UserSession {
        UserSession {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// Realm data as it appears in the seed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryIdentityProvider {
    #[serde(default)]
    pub realm_roles: BTreeSet<String>,
    /// Client id to the roles that client defines.
    #[serde(default)]
    pub clients: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realm_role(mut self, role: impl Into<String>) -> Self {
        self.realm_roles.insert(role.into());
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.clients.entry(client_id.into()).or_default();
        self
    }

    pub fn with_client_role(mut self, client_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.clients
            .entry(client_id.into())
            .or_default()
            .insert(role.into());
        self
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_session(mut self, session: SessionRecord) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn user_by_username(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.username == username)
    }

    pub fn session_record(&self, session_id: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|session| session.id == session_id)
    }

    fn user(&self, principal: &Principal) -> anyhow::Result<&UserRecord> {
        self.users
            .iter()
            .find(|user| user.id == principal.user_id)
            .ok_or_else(|| anyhow::anyhow!("unknown user {}", principal.user_id))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn user_attribute(&self, principal: &Principal, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .user(principal)?
            .attributes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn user_property(
        &self,
        principal: &Principal,
        property: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self.user(principal)?.property(property))
    }

    async fn session_note(
        &self,
        session: &UserSession,
        key: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .session_record(&session.session_id)
            .and_then(|record| record.notes.get(key).cloned()))
    }

    async fn effective_roles(&self, principal: &Principal) -> anyhow::Result<Vec<RoleRef>> {
        let user = self.user(principal)?;
        let mut roles: Vec<RoleRef> = Vec::with_capacity(user.roles.len());
        for encoded in &user.roles {
            let role = self.parse_role(encoded)?;
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    async fn group_memberships(&self, principal: &Principal) -> anyhow::Result<Vec<GroupRef>> {
        Ok(self.user(principal)?.groups.iter().map(GroupRef::new).collect())
    }
}

impl RoleCatalog for InMemoryIdentityProvider {
    fn client_exists(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    fn role_exists(&self, role: &RoleRef) -> bool {
        match &role.scope {
            RoleScope::Realm => self.realm_roles.contains(&role.name),
            RoleScope::Client { client_id } => self
                .clients
                .get(client_id)
                .is_some_and(|roles| roles.contains(&role.name)),
        }
    }
}
