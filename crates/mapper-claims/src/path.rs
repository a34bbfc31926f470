//! Nested claim paths.
//!
//! # Purpose
//! A configured claim name such as `address.street` addresses a nested
//! object member. `ClaimPath` keeps the parsed segments so that names
//! containing literal dots (escaped as `\.`) survive the trip.
//!
//! # Key invariants
//! - A path has at least one segment and no segment is empty.
//! - `Display` renders the escaped form, so parsing it back is lossless.
use crate::{ClaimError, ClaimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimPath(Vec<String>);

impl ClaimPath {
    /// Parse a dotted claim name, honouring `\.` as a literal dot.
    ///
    /// # Errors
    /// - [`ClaimError::InvalidClaimPath`] for empty names or empty segments.
    pub fn parse(name: &str) -> ClaimResult<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = name.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        segments.push(current);
        Self::from_segments(segments).map_err(|_| ClaimError::InvalidClaimPath(name.to_string()))
    }

    /// Build a path from already-split segments.
    ///
    /// # Errors
    /// - [`ClaimError::InvalidClaimPath`] when any segment is empty.
    pub fn from_segments<I, S>(segments: I) -> ClaimResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            return Err(ClaimError::InvalidClaimPath(segments.join(".")));
        }
        Ok(Self(segments))
    }

    // Callers guarantee non-empty segments.
    pub(crate) fn from_parts(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl std::str::FromStr for ClaimPath {
    type Err = ClaimError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl std::fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|s| s.replace('.', "\\.")).collect();
        f.write_str(&rendered.join("."))
    }
}
