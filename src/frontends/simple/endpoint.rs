//! A generic guard assembled from independent primitives.
use crate::code_grant::resource::{self, Authorization, Endpoint, Error};
use crate::primitives::issuer::Issuer;
use crate::primitives::principal::Role;
use crate::primitives::roles::RoleRegistry;

use super::request::{Request, Response};

/// Guards a single resource with a scope requirement.
///
/// All attributes are public, so there is no inner invariant. Substitute the role registry with
/// [`Vacant`] when only client tokens are expected: users then hold exactly the scopes of their
/// token.
///
/// ```
/// # use chrono::{Duration, Utc};
/// # use oxide_auth_scope::primitives::prelude::*;
/// use oxide_auth_scope::frontends::simple::endpoint::{Guard, Vacant};
/// use oxide_auth_scope::frontends::simple::request::{Request, Status};
///
/// let mut tokens = TokenMap::new();
/// tokens.import_grant("t0k3n".to_string(), Grant {
///     owner_id: "client".to_string(),
///     owner_type: OwnerType::Client,
///     client_id: "client".to_string(),
///     scope: "read".parse().unwrap(),
///     until: Utc::now() + Duration::hours(1),
/// });
///
/// let mut guard = Guard::new("read|write", tokens, Vacant);
/// assert_eq!(guard.respond(&Request::bearer("t0k3n")).status, Status::Ok);
/// assert_eq!(guard.respond(&Request::bearer("other")).status, Status::Unauthorized);
/// ```
///
/// [`Vacant`]: struct.Vacant.html
pub struct Guard<I, R> {
    /// The requirement of the resource, `None` if any valid token is enough.
    pub requirement: Option<String>,

    /// Looks up the grants of bearer tokens.
    pub issuer: I,

    /// Looks up the roles of users.
    pub roles: R,

    /// Realm reported in authentication challenges.
    pub realm: Option<String>,
}

/// Marker for a primitive that is not provided.
///
/// As a role registry it attaches no role to anyone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Vacant;

impl<I: Issuer, R: RoleRegistry> Guard<I, R> {
    /// Guard with the given requirement string.
    pub fn new(requirement: &str, issuer: I, roles: R) -> Self {
        Guard {
            requirement: Some(requirement.to_string()),
            issuer,
            roles,
            realm: None,
        }
    }

    /// Report `realm` in authentication challenges.
    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = Some(realm.to_string());
        self
    }

    /// Check the request against the requirement.
    pub fn protect(&mut self, request: &dyn resource::Request) -> Result<Authorization, Error> {
        resource::protect(self, request)
    }

    /// Check the request and build the response reporting the outcome.
    pub fn respond(&mut self, request: &Request) -> Response {
        match self.protect(request) {
            Ok(_) => Response::ok(),
            Err(error) => Response::from_error(error),
        }
    }
}

impl<I: Issuer, R: RoleRegistry> Endpoint for Guard<I, R> {
    fn requirement(&mut self) -> Option<&str> {
        self.requirement.as_ref().map(String::as_str)
    }

    fn issuer(&mut self) -> &dyn Issuer {
        &self.issuer
    }

    fn roles(&mut self) -> &dyn RoleRegistry {
        &self.roles
    }

    fn realm(&mut self) -> Option<&str> {
        self.realm.as_ref().map(String::as_str)
    }
}

impl RoleRegistry for Vacant {
    fn roles(&self, _: &str) -> Result<Vec<Role>, ()> {
        Ok(Vec::new())
    }
}
