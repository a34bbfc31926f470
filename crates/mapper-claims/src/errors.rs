use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("unsupported json type: {0}")]
    UnsupportedJsonType(String),
    #[error("cannot coerce {value:?} to {json_type}")]
    Coercion { value: String, json_type: String },
    #[error("invalid role reference: {0:?}")]
    InvalidRoleReference(String),
    #[error("invalid claim path: {0:?}")]
    InvalidClaimPath(String),
}

pub type ClaimResult<T> = Result<T, ClaimError>;
