//! Mapper instance validation.
//!
//! # Purpose
//! Checks a candidate mapper against its type schema and the client's other
//! mappers before the store persists it. Validation is side-effect free apart
//! from a rejection counter; the store decides what to do with the result.
//!
//! # Check order
//! The first failing check wins:
//! 1. type id resolves in the registry
//! 2. name is non-empty
//! 3. name is unused by the client's other mappers
//! 4. required schema keys have non-empty values
//! 5. consent text is present when consent is required
//! 6. role references parse and name an existing role
//!
//! # Normalization
//! A valid candidate is returned normalized: config restricted to schema keys,
//! protocol taken from the descriptor, consent text cleared when consent is
//! not required.
use crate::model::{MapperInstance, PropertyKind};
use crate::providers::RoleCatalog;
use crate::registry::MapperRegistry;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown mapper type: {type_id}")]
    UnknownType { type_id: String },
    #[error("mapper name is required")]
    MissingName,
    #[error("mapper name already used by this client: {name}")]
    DuplicateName { name: String },
    #[error("missing required config value: {field}")]
    MissingRequiredField { field: String },
    #[error("consent text is required when consent is required")]
    MissingConsentText,
    #[error("invalid role reference in {field}: {value}")]
    InvalidRoleReference { field: String, value: String },
}

impl ValidationError {
    /// Stable category label for callers and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            ValidationError::UnknownType { .. } => "unknown_type",
            ValidationError::MissingName => "missing_name",
            ValidationError::DuplicateName { .. } => "duplicate_name",
            ValidationError::MissingRequiredField { .. } => "missing_required_field",
            ValidationError::MissingConsentText => "missing_consent_text",
            ValidationError::InvalidRoleReference { .. } => "invalid_role_reference",
        }
    }

    /// The submitted field the rejection is about.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::UnknownType { .. } => "typeId",
            ValidationError::MissingName | ValidationError::DuplicateName { .. } => "name",
            ValidationError::MissingRequiredField { field }
            | ValidationError::InvalidRoleReference { field, .. } => field,
            ValidationError::MissingConsentText => "consentText",
        }
    }
}

#[derive(Clone)]
pub struct Validator {
    registry: Arc<MapperRegistry>,
    roles: Arc<dyn RoleCatalog>,
}

impl Validator {
    pub fn new(registry: Arc<MapperRegistry>, roles: Arc<dyn RoleCatalog>) -> Self {
        Self { registry, roles }
    }

    pub fn registry(&self) -> &Arc<MapperRegistry> {
        &self.registry
    }

    /// Validate `candidate` against `existing`, the client's current mappers.
    ///
    /// `existing` may include `candidate` itself (on update); entries sharing
    /// its id are ignored for the uniqueness check.
    pub fn validate(
        &self,
        candidate: MapperInstance,
        existing: &[MapperInstance],
    ) -> Result<MapperInstance, ValidationError> {
        self.check(candidate, existing).inspect_err(|err| {
            metrics::counter!(
                "mapper_validation_rejections_total",
                "category" => err.category()
            )
            .increment(1);
            tracing::debug!(
                category = err.category(),
                field = err.field(),
                error = %err,
                "mapper rejected"
            );
        })
    }

    fn check(
        &self,
        mut candidate: MapperInstance,
        existing: &[MapperInstance],
    ) -> Result<MapperInstance, ValidationError> {
        let descriptor =
            self.registry
                .descriptor(&candidate.type_id)
                .ok_or_else(|| ValidationError::UnknownType {
                    type_id: candidate.type_id.clone(),
                })?;

        if candidate.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if existing
            .iter()
            .any(|other| other.id != candidate.id && other.name == candidate.name)
        {
            return Err(ValidationError::DuplicateName {
                name: candidate.name,
            });
        }

        candidate.config.retain(|key, _| descriptor.has_key(key));
        for field in descriptor.required_keys() {
            let present = candidate
                .config
                .get(field)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ValidationError::MissingRequiredField {
                    field: field.to_string(),
                });
            }
        }

        if candidate.consent_required {
            let has_text = candidate
                .consent_text
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty());
            if !has_text {
                return Err(ValidationError::MissingConsentText);
            }
        } else {
            candidate.consent_text = None;
        }

        for spec in &descriptor.config_schema {
            if spec.kind != PropertyKind::RoleRef {
                continue;
            }
            let Some(value) = candidate.config.get(&spec.key) else {
                continue;
            };
            let resolves = self
                .roles
                .parse_role(value)
                .is_ok_and(|role| self.roles.role_exists(&role));
            if !resolves {
                return Err(ValidationError::InvalidRoleReference {
                    field: spec.key.clone(),
                    value: value.clone(),
                });
            }
        }

        candidate.protocol = descriptor.protocol;
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MapperId, NewMapper};
    use crate::providers::memory::InMemoryIdentityProvider;
    use crate::transform::builtin;

    fn validator() -> Validator {
        let realm = InMemoryIdentityProvider::new()
            .with_realm_role("offline_access")
            .with_client_role("account", "view-profile");
        Validator::new(Arc::new(MapperRegistry::with_builtins()), Arc::new(realm))
    }

    fn role_mapper(id: &str, name: &str, role: &str) -> MapperInstance {
        NewMapper::new("app", name, builtin::HARDCODED_ROLE)
            .with_config("role", role)
            .into_instance(MapperId::new(id))
    }

    #[test]
    fn accepts_and_normalizes() {
        let mut candidate = role_mapper("m1", "hardcoded role", "offline_access");
        candidate.config.insert("stray".to_string(), "x".to_string());
        candidate.consent_text = Some("ignored".to_string());

        let valid = validator().validate(candidate, &[]).expect("valid");
        assert_eq!(valid.config.len(), 1);
        assert_eq!(valid.consent_text, None);
    }

    #[test]
    fn rejects_in_check_order() {
        let validator = validator();

        let mut unknown = role_mapper("m1", "", "");
        unknown.type_id = "nope".to_string();
        let err = validator.validate(unknown, &[]).expect_err("unknown type");
        assert_eq!(err.category(), "unknown_type");
        assert_eq!(err.field(), "typeId");

        let err = validator
            .validate(role_mapper("m1", " ", ""), &[])
            .expect_err("missing name");
        assert_eq!(err, ValidationError::MissingName);

        let existing = [role_mapper("m0", "email", "offline_access")];
        let err = validator
            .validate(role_mapper("m1", "email", ""), &existing)
            .expect_err("duplicate");
        assert_eq!(err.category(), "duplicate_name");

        let err = validator
            .validate(role_mapper("m1", "role", ""), &[])
            .expect_err("missing role");
        assert!(matches!(
            &err,
            ValidationError::MissingRequiredField { field } if field == "role"
        ));

        let mut consent = role_mapper("m1", "role", "offline_access");
        consent.consent_required = true;
        let err = validator.validate(consent, &[]).expect_err("consent text");
        assert_eq!(err.field(), "consentText");

        let err = validator
            .validate(role_mapper("m1", "role", "account.manage"), &[])
            .expect_err("bad role");
        assert_eq!(err.category(), "invalid_role_reference");
        assert_eq!(err.field(), "role");
    }

    #[test]
    fn duplicate_check_ignores_self() {
        let current = role_mapper("m1", "hardcoded role", "offline_access");
        let edited = role_mapper("m1", "hardcoded role", "account.view-profile");
        let valid = validator()
            .validate(edited, std::slice::from_ref(&current))
            .expect("self is not a duplicate");
        assert_eq!(valid.config["role"], "account.view-profile");
    }

    #[test]
    fn duplicate_names_collide_across_types() {
        let existing = [role_mapper("m0", "email", "offline_access")];
        let candidate = NewMapper::new("app", "email", builtin::FULL_NAME)
            .into_instance(MapperId::new("m1"));
        let err = validator()
            .validate(candidate, &existing)
            .expect_err("duplicate");
        assert!(matches!(err, ValidationError::DuplicateName { name } if name == "email"));
    }
}
