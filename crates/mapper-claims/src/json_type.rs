//! JSON type labels and claim value coercion.
//!
//! # Purpose
//! Converts the string values held in mapper configuration into typed JSON
//! claim values according to a mapper's `jsonType.label`.
//!
//! # Key invariants
//! - Labels are matched exactly (`String`, `boolean`, `int`, `long`, `JSON`);
//!   a missing label means `String`.
//! - `String` coercion never fails.
//! - Numeric coercion respects the width of the label: `int` is 32-bit and
//!   `long` is 64-bit.
//!
//! # Examples
//! ```rust
//! use mapper_claims::{JsonType, coerce};
//! use serde_json::json;
//!
//! assert_eq!(coerce("5", Some("int")).unwrap(), json!(5));
//! assert_eq!(JsonType::Boolean.coerce("TRUE").unwrap(), json!(true));
//! ```
//!
//! # Common pitfalls
//! - Treating coercion failures as fatal; callers drop the claim and continue.
use crate::{ClaimError, ClaimResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target JSON type for a claim value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JsonType {
    #[default]
    #[serde(rename = "String")]
    String,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "JSON")]
    Json,
}

impl JsonType {
    /// All supported labels in display order.
    pub const ALL: [JsonType; 5] = [
        JsonType::String,
        JsonType::Boolean,
        JsonType::Int,
        JsonType::Long,
        JsonType::Json,
    ];

    /// The configuration label for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "String",
            JsonType::Boolean => "boolean",
            JsonType::Int => "int",
            JsonType::Long => "long",
            JsonType::Json => "JSON",
        }
    }

    /// Coerce a raw configuration string into a JSON value of this type.
    ///
    /// # Errors
    /// - [`ClaimError::Coercion`] when `value` does not parse as this type.
    pub fn coerce(&self, value: &str) -> ClaimResult<Value> {
        let failed = || ClaimError::Coercion {
            value: value.to_string(),
            json_type: self.as_str().to_string(),
        };
        match self {
            JsonType::String => Ok(Value::String(value.to_string())),
            JsonType::Boolean => {
                if value.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if value.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(failed())
                }
            }
            JsonType::Int => value
                .trim()
                .parse::<i32>()
                .map(Value::from)
                .map_err(|_| failed()),
            JsonType::Long => value
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| failed()),
            JsonType::Json => serde_json::from_str(value).map_err(|_| failed()),
        }
    }
}

impl std::str::FromStr for JsonType {
    type Err = ClaimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        JsonType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| ClaimError::UnsupportedJsonType(value.to_string()))
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerce `value` using an optional `jsonType.label`.
///
/// # Errors
/// - [`ClaimError::UnsupportedJsonType`] for an unknown label.
/// - [`ClaimError::Coercion`] when the value does not parse.
pub fn coerce(value: &str, json_type: Option<&str>) -> ClaimResult<Value> {
    let json_type = match json_type {
        Some(label) if !label.is_empty() => label.parse()?,
        _ => JsonType::String,
    };
    json_type.coerce(value)
}
