//! Seed document loading.
//!
//! A seed document describes an in-memory realm, the mappers to create for its
//! clients, and issuance previews to run once everything is loaded. JSON is
//! read from `.json` files; anything else is parsed as YAML.
use crate::model::NewMapper;
use crate::providers::memory::InMemoryIdentityProvider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub realm: InMemoryIdentityProvider,
    #[serde(default)]
    pub mappers: Vec<NewMapper>,
    #[serde(default)]
    pub previews: Vec<PreviewRequest>,
}

/// Claim assembly to run for `username` against `client_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub client_id: String,
    pub username: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SeedDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read seed document: {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents).with_context(|| "parse seed document json")
        } else {
            serde_yaml::from_str(&contents).with_context(|| "parse seed document yaml")
        }
    }
}
