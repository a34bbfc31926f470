//! Mapper transforms: the per-type claim-producing capability.
//!
//! # Purpose
//! Every registered mapper type pairs a [`MapperTypeDescriptor`] with a
//! [`MapperTransform`]. At issuance the claim pipeline hands each transform a
//! [`MapperConfig`] view of the instance configuration and a
//! [`TransformContext`] carrying the principal, session, and read-only
//! providers; the transform returns the claim contributions it wants merged.
//!
//! # Key invariants
//! - Transforms only read; they never touch the store or provider state.
//! - Schema defaults apply at read time through [`MapperConfig::get`]; they
//!   are never written back into the stored configuration.
//! - A transform error affects only its own mapper's contributions.
pub mod builtin;

use crate::model::{MapperConfigMap, MapperTypeDescriptor};
use crate::providers::{IdentityProvider, Principal, RoleCatalog, UserSession};
use async_trait::async_trait;
use mapper_claims::{ClaimContribution, ClaimError, ClaimPath, ClaimTarget};
use serde_json::Value;
use thiserror::Error;

pub use builtin::BuiltinMapper;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error("missing config value: {0}")]
    MissingConfig(String),
    #[error("identity provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type TransformResult<T> = Result<T, TransformError>;

/// Request-scoped inputs shared by every transform in one issuance.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub client_id: &'a str,
    pub principal: &'a Principal,
    pub session: &'a UserSession,
    pub identity: &'a dyn IdentityProvider,
    pub roles: &'a dyn RoleCatalog,
}

/// Read view over an instance's configuration, resolved against its schema.
#[derive(Debug, Clone, Copy)]
pub struct MapperConfig<'a> {
    descriptor: &'a MapperTypeDescriptor,
    values: &'a MapperConfigMap,
}

impl<'a> MapperConfig<'a> {
    pub fn new(descriptor: &'a MapperTypeDescriptor, values: &'a MapperConfigMap) -> Self {
        Self { descriptor, values }
    }

    /// Non-empty configured value, else the schema default.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        let descriptor = self.descriptor;
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .or_else(|| {
                descriptor
                    .spec(key)
                    .and_then(|spec| spec.default_value.as_deref())
            })
    }

    /// Like [`MapperConfig::get`] but a missing value is an error.
    pub fn require(&self, key: &str) -> TransformResult<&'a str> {
        self.get(key)
            .ok_or_else(|| TransformError::MissingConfig(key.to_string()))
    }

    /// Boolean flag: only the string `"true"` enables.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    pub fn json_type(&self) -> Option<&'a str> {
        self.get("jsonType.label")
    }

    /// Token targets switched on by this instance's `*.token.claim` flags.
    pub fn enabled_targets(&self) -> Vec<ClaimTarget> {
        ClaimTarget::ALL
            .into_iter()
            .filter(|target| {
                self.descriptor.has_key(target.config_flag()) && self.flag(target.config_flag())
            })
            .collect()
    }

    /// Set `value` at `claim_name` in every enabled target.
    pub fn emit(&self, claim_name: &str, value: Value) -> TransformResult<Vec<ClaimContribution>> {
        let path = ClaimPath::parse(claim_name)?;
        Ok(self
            .enabled_targets()
            .into_iter()
            .map(|target| ClaimContribution::set(target, path.clone(), value.clone()))
            .collect())
    }

    /// Append `value` at `path` in every enabled target.
    pub fn emit_append(&self, path: &ClaimPath, value: Value) -> Vec<ClaimContribution> {
        self.enabled_targets()
            .into_iter()
            .map(|target| ClaimContribution::append(target, path.clone(), value.clone()))
            .collect()
    }
}

#[async_trait]
pub trait MapperTransform: Send + Sync {
    async fn transform(
        &self,
        config: &MapperConfig<'_>,
        ctx: &TransformContext<'_>,
    ) -> TransformResult<Vec<ClaimContribution>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertySpec, Protocol};

    fn descriptor() -> MapperTypeDescriptor {
        MapperTypeDescriptor::new("test-mapper", "Test", Protocol::Oidc)
            .property(PropertySpec::string("claim.name").default_value("groups"))
            .property(PropertySpec::boolean("id.token.claim"))
            .property(PropertySpec::boolean("access.token.claim").default_value("true"))
    }

    #[test]
    fn defaults_fill_missing_and_empty_values() {
        let descriptor = descriptor();
        let values = MapperConfigMap::from([("claim.name".to_string(), String::new())]);
        let config = MapperConfig::new(&descriptor, &values);
        assert_eq!(config.get("claim.name"), Some("groups"));
        assert!(matches!(
            config.require("missing"),
            Err(TransformError::MissingConfig(key)) if key == "missing"
        ));
    }

    #[test]
    fn targets_follow_flags_and_schema() {
        let descriptor = descriptor();
        let values = MapperConfigMap::from([
            ("id.token.claim".to_string(), "true".to_string()),
            ("access.token.claim".to_string(), "false".to_string()),
            ("userinfo.token.claim".to_string(), "true".to_string()),
        ]);
        let config = MapperConfig::new(&descriptor, &values);
        // userinfo is not part of this schema, so its flag is ignored.
        assert_eq!(config.enabled_targets(), vec![ClaimTarget::IdToken]);

        let defaults = MapperConfigMap::new();
        let config = MapperConfig::new(&descriptor, &defaults);
        assert_eq!(config.enabled_targets(), vec![ClaimTarget::AccessToken]);
    }
}
