//! Mapper type descriptors and configuration property schemas.
//!
//! # Purpose
//! Describes each registered mapper type: its id, display name, protocol, and
//! the ordered configuration properties an instance of it accepts.
use super::Protocol;
use mapper_claims::JsonType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    String,
    Boolean,
    Enum,
    RoleRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub key: String,
    pub kind: PropertyKind,
    pub required: bool,
    pub default_value: Option<String>,
    /// Allowed values for `Enum` properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl PropertySpec {
    fn new(key: &str, kind: PropertyKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
            required: false,
            default_value: None,
            options: Vec::new(),
        }
    }

    pub fn string(key: &str) -> Self {
        Self::new(key, PropertyKind::String)
    }

    pub fn boolean(key: &str) -> Self {
        Self::new(key, PropertyKind::Boolean)
    }

    pub fn role(key: &str) -> Self {
        Self::new(key, PropertyKind::RoleRef)
    }

    /// `jsonType.label` enum over the supported claim JSON types.
    pub fn json_type() -> Self {
        let mut spec = Self::new("jsonType.label", PropertyKind::Enum);
        spec.options = JsonType::ALL
            .iter()
            .map(|json_type| json_type.as_str().to_string())
            .collect();
        spec
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperTypeDescriptor {
    pub type_id: String,
    pub display_name: String,
    pub protocol: Protocol,
    pub config_schema: Vec<PropertySpec>,
}

impl MapperTypeDescriptor {
    pub fn new(type_id: &str, display_name: &str, protocol: Protocol) -> Self {
        Self {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            protocol,
            config_schema: Vec::new(),
        }
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.config_schema.push(spec);
        self
    }

    pub fn spec(&self, key: &str) -> Option<&PropertySpec> {
        self.config_schema.iter().find(|spec| spec.key == key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.spec(key).is_some()
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.config_schema
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lookup_and_required_keys() {
        let descriptor = MapperTypeDescriptor::new("t", "T", Protocol::Oidc)
            .property(PropertySpec::string("claim.name").required())
            .property(PropertySpec::json_type())
            .property(PropertySpec::boolean("id.token.claim").default_value("true"));

        assert!(descriptor.has_key("jsonType.label"));
        assert!(!descriptor.has_key("role"));
        assert_eq!(descriptor.required_keys().collect::<Vec<_>>(), ["claim.name"]);
        assert_eq!(
            descriptor
                .spec("id.token.claim")
                .and_then(|spec| spec.default_value.as_deref()),
            Some("true")
        );
        assert_eq!(descriptor.spec("jsonType.label").map(|s| s.options.len()), Some(5));
    }
}
