//! Claim primitives shared by the protocol mapper engine.
//!
//! # Purpose
//! Holds the I/O-free building blocks of token claim assembly: JSON type
//! coercion, nested claim paths, realm/client role references, and the
//! ordered merge of claim contributions into a claim document.
//!
//! # How it fits
//! The mapper engine's built-in transforms produce [`ClaimContribution`]s;
//! the claim pipeline folds them into one [`ClaimSet`] per token target.
//! Validation uses [`RoleRef::parse`] to check role references at write time.
//!
//! # Key invariants
//! - Coercion never panics; bad values surface as [`ClaimError::Coercion`].
//! - Role strings use `role` (realm) or `client.role` (client) encoding.
//! - Contributions applied in the same order always yield the same document.
//!
//! # Examples
//! ```rust
//! use mapper_claims::{ClaimContribution, ClaimPath, ClaimSet, ClaimTarget, coerce};
//!
//! let value = coerce("42", Some("long")).unwrap();
//! let contribution =
//!     ClaimContribution::set(ClaimTarget::IdToken, ClaimPath::parse("answer").unwrap(), value);
//! let mut claims = ClaimSet::new();
//! claims.apply_contribution(&contribution);
//! assert_eq!(claims.lookup("answer"), Some(&serde_json::json!(42)));
//! ```
//!
//! # Common pitfalls
//! - Parsing client roles without a client lookup: `team.lead` is a realm role
//!   unless a `team` client exists.

mod claim_set;
mod contribution;
mod errors;
mod json_type;
mod path;
mod role;

pub use claim_set::ClaimSet;
pub use contribution::{ClaimContribution, ClaimOp, ClaimTarget};
pub use errors::{ClaimError, ClaimResult};
pub use json_type::{JsonType, coerce};
pub use path::ClaimPath;
pub use role::{RoleRef, RoleScope};
