//! A collection of primitives for protecting resources with scope requirements.
//!
//! A primitive is the smallest independent unit of policy. Parsing a requirement, evaluating it,
//! looking up the grant of a token and the roles of a user are all separate so that each of them
//! can be replaced, for example by a database backed implementation of [`Issuer`] or
//! [`RoleRegistry`].
//!
//! ```
//! # use oxide_auth_scope::primitives::prelude::*;
//! let expr = ScopeExpr::parse("read&(write|admin)").unwrap();
//!
//! let user = Principal::User {
//!     scope: "read".parse().unwrap(),
//!     roles: vec![Role::new("admin", "admin".parse().unwrap())],
//! };
//!
//! assert!(evaluate(&expr, &user));
//! ```
//!
//! [`Issuer`]: issuer/trait.Issuer.html
//! [`RoleRegistry`]: roles/trait.RoleRegistry.html

use chrono::DateTime;
use chrono::Utc;

pub mod evaluator;
pub mod expression;
pub mod grant;
pub mod issuer;
pub mod principal;
pub mod roles;
pub mod scope;

type Time = DateTime<Utc>;

/// Commonly used primitives for frontends and backends.
pub mod prelude {
    pub use super::evaluator::{evaluate, try_evaluate, ScopeOracle};
    pub use super::expression::{Element, MalformedScopeExpression, Operator, ScopeExpr};
    pub use super::grant::Grant;
    pub use super::issuer::{Issuer, TokenMap};
    pub use super::principal::{OwnerType, Principal, Role};
    pub use super::roles::{RoleMap, RoleRegistry};
    pub use super::scope::Scope;
}
