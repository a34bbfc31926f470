use crate::ClaimPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token (or response) a contribution is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimTarget {
    IdToken,
    AccessToken,
    Userinfo,
}

impl ClaimTarget {
    pub const ALL: [ClaimTarget; 3] = [
        ClaimTarget::IdToken,
        ClaimTarget::AccessToken,
        ClaimTarget::Userinfo,
    ];

    /// Mapper config flag that enables this target.
    pub fn config_flag(&self) -> &'static str {
        match self {
            ClaimTarget::IdToken => "id.token.claim",
            ClaimTarget::AccessToken => "access.token.claim",
            ClaimTarget::Userinfo => "userinfo.token.claim",
        }
    }
}

/// How a contribution combines with what is already at its path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOp {
    /// Replace whatever is at the path (last write wins).
    Set,
    /// Add to the array at the path, skipping values already present.
    Append,
    /// Remove matching values from the array at the path.
    Remove,
    /// Remove `old` from `from`; only if it was there, append the
    /// contribution value at the path.
    Rename { from: ClaimPath, old: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimContribution {
    pub target: ClaimTarget,
    pub path: ClaimPath,
    pub value: Value,
    pub op: ClaimOp,
}

impl ClaimContribution {
    pub fn set(target: ClaimTarget, path: ClaimPath, value: Value) -> Self {
        Self {
            target,
            path,
            value,
            op: ClaimOp::Set,
        }
    }

    pub fn append(target: ClaimTarget, path: ClaimPath, value: Value) -> Self {
        Self {
            target,
            path,
            value,
            op: ClaimOp::Append,
        }
    }

    /// Replace `old` at `from` with `value` at `path`, when `old` is present
    /// at merge time.
    pub fn rename(
        target: ClaimTarget,
        from: ClaimPath,
        old: Value,
        path: ClaimPath,
        value: Value,
    ) -> Self {
        Self {
            target,
            path,
            value,
            op: ClaimOp::Rename { from, old },
        }
    }
}
