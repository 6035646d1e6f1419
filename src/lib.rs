//! # oxide-auth-scope
//!
//! Guards resources with boolean scope requirements, for use with oxide-auth style bearer tokens
//! or any other token storage.
//!
//! ## About
//!
//! OAuth scopes on their own only express a conjunction: a token needs all of the scopes a
//! resource asks for. Many services need more than that, a listing might be readable with either
//! `read_users` or `manage_users`, or an export might require `export` together with one of two
//! read scopes. This crate attaches a small formula to each resource instead:
//!
//! ```text
//! read_users|manage_users
//! export&(read_users|read_roles)
//! ```
//!
//! Literals are combined by `&` and `|` strictly from left to right, only parentheses group.
//!
//! ## Protecting a resource
//!
//! The [`primitives`] provide the parsing of requirements, their evaluation, and in-memory lookups
//! of token grants and user roles. The [`code_grant::resource`] state machine ties them together
//! into the check of a single request: extract the bearer token, parse the requirement, recover
//! the grant, resolve user roles and evaluate. Client tokens are judged by their own scope, user
//! tokens additionally by the scopes of the roles attached to the user.
//!
//! For most uses the [`Guard`] of the [`frontends::simple`] module is enough, optionally created
//! from a [`GuardConfig`] describing all routes of a service.
//!
//! [`primitives`]: primitives/index.html
//! [`code_grant::resource`]: code_grant/resource/index.html
//! [`frontends::simple`]: frontends/simple/index.html
//! [`Guard`]: frontends/simple/endpoint/struct.Guard.html
//! [`GuardConfig`]: config/struct.GuardConfig.html
#![warn(missing_docs)]

pub mod code_grant;
pub mod config;
pub mod frontends;
pub mod primitives;
