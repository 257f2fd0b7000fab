//! # Access Control Gate
//!
//! Resolves the caller's credential against an immutable policy table.
//! Authorization runs before any existence check, so a denial never
//! reveals whether the target exists.

mod credential;
mod errors;
mod policy;

pub use credential::Credential;
pub use errors::{AccessError, AccessResult};
pub use policy::{AccessGate, AccessPolicy, Action, AssetKind, PolicyConfig, Rule, RuleConfig, ANY_ORG};
