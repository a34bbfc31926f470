//! Mapper instance model, edit patches, and change-log payloads.
//!
//! # Purpose
//! Defines the per-client protocol mapper records owned by the store, the
//! shape of edits applied to them, and the change events the store records.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque mapper identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapperId(String);

impl MapperId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MapperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "openid-connect")]
    Oidc,
    #[serde(rename = "saml")]
    Saml,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Oidc => "openid-connect",
            Protocol::Saml => "saml",
        }
    }
}

/// Mapper configuration values keyed by schema property key.
pub type MapperConfigMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperInstance {
    pub id: MapperId,
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub type_id: String,
    #[serde(default)]
    pub consent_required: bool,
    #[serde(default)]
    pub consent_text: Option<String>,
    #[serde(default)]
    pub config: MapperConfigMap,
}

/// A mapper submission before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapper {
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub type_id: String,
    #[serde(default)]
    pub consent_required: bool,
    #[serde(default)]
    pub consent_text: Option<String>,
    #[serde(default)]
    pub config: MapperConfigMap,
}

impl NewMapper {
    pub fn new(
        client_id: impl Into<String>,
        name: impl Into<String>,
        type_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            name: name.into(),
            protocol: Protocol::Oidc,
            type_id: type_id.into(),
            consent_required: false,
            consent_text: None,
            config: MapperConfigMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_consent(mut self, text: impl Into<String>) -> Self {
        self.consent_required = true;
        self.consent_text = Some(text.into());
        self
    }

    pub fn into_instance(self, id: MapperId) -> MapperInstance {
        MapperInstance {
            id,
            client_id: self.client_id,
            name: self.name,
            protocol: self.protocol,
            type_id: self.type_id,
            consent_required: self.consent_required,
            consent_text: self.consent_text,
            config: self.config,
        }
    }
}

/// Edit applied to an existing mapper.
///
/// `None` leaves a field untouched; `config` replaces the whole map. The
/// mapper type cannot be changed after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperPatch {
    pub name: Option<String>,
    pub consent_required: Option<bool>,
    pub consent_text: Option<String>,
    pub config: Option<MapperConfigMap>,
}

impl MapperPatch {
    pub fn apply_to(&self, current: &MapperInstance) -> MapperInstance {
        let mut next = current.clone();
        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(consent_required) = self.consent_required {
            next.consent_required = consent_required;
        }
        if let Some(consent_text) = &self.consent_text {
            next.consent_text = Some(consent_text.clone());
        }
        if let Some(config) = &self.config {
            next.config = config.clone();
        }
        next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperChange {
    pub seq: u64,
    pub op: MapperChangeOp,
    pub id: MapperId,
    pub client_id: String,
    pub mapper: Option<MapperInstance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MapperChangeOp {
    Created,
    Updated,
    Deleted,
}

impl MapperChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapperChangeOp::Created => "created",
            MapperChangeOp::Updated => "updated",
            MapperChangeOp::Deleted => "deleted",
        }
    }
}
