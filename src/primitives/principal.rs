//! The authenticated entity behind an access token.
//!
//! Clients are authorized by the scope of their token alone. Users additionally hold the scopes
//! of every role attached to them.
use serde_derive::{Deserialize, Serialize};

use super::evaluator::ScopeOracle;
use super::scope::Scope;

/// Distinguishes the kind of resource owner a grant was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    /// The client application itself, for example through the client credentials grant.
    Client,

    /// An end user on whose behalf the client acts.
    User,
}

/// A named bundle of scopes that can be attached to users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique name of the role.
    pub name: String,

    /// The scopes every holder of the role gains.
    pub scopes: Scope,
}

/// The principal whose scopes a requirement is checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    /// A client, only the scope of its token counts.
    Client {
        /// Scope granted to the token.
        scope: Scope,
    },

    /// An end user, the token scope and the scopes of all roles count.
    User {
        /// Scope granted to the token.
        scope: Scope,

        /// Roles attached to the user.
        roles: Vec<Role>,
    },
}

impl Role {
    /// Create a role with the given scopes.
    pub fn new(name: &str, scopes: Scope) -> Self {
        Role {
            name: name.to_string(),
            scopes,
        }
    }
}

impl Principal {
    /// The kind of owner this principal represents.
    pub fn owner_type(&self) -> OwnerType {
        match self {
            Principal::Client { .. } => OwnerType::Client,
            Principal::User { .. } => OwnerType::User,
        }
    }

    /// The scope granted to the token itself.
    pub fn token_scope(&self) -> &Scope {
        match self {
            Principal::Client { scope } => scope,
            Principal::User { scope, .. } => scope,
        }
    }

    /// Determine if the principal holds a single scope.
    ///
    /// True if the token carries the scope or, for users only, if any attached role does.
    pub fn has_scope(&self, name: &str) -> bool {
        match self {
            Principal::Client { scope } => scope.contains(name),
            Principal::User { scope, roles } => {
                scope.contains(name) || roles.iter().any(|role| role.scopes.contains(name))
            }
        }
    }

    /// Every scope the principal holds.
    pub fn resolved_scopes(&self) -> Scope {
        match self {
            Principal::Client { scope } => scope.clone(),
            Principal::User { scope, roles } => roles
                .iter()
                .fold(scope.clone(), |all, role| all.union(&role.scopes)),
        }
    }
}

impl ScopeOracle for Principal {
    fn has_scope(&self, scope: &str) -> bool {
        Principal::has_scope(self, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Role {
        Role::new("manager", "manage_users read".parse().unwrap())
    }

    #[test]
    fn user_holds_role_scopes() {
        let user = Principal::User {
            scope: "read".parse().unwrap(),
            roles: vec![manager()],
        };

        assert!(user.has_scope("read"));
        assert!(user.has_scope("manage_users"));
        assert!(!user.has_scope("write"));
        assert_eq!(user.owner_type(), OwnerType::User);
        assert_eq!(user.resolved_scopes(), "manage_users read".parse::<Scope>().unwrap());
    }

    #[test]
    fn client_ignores_roles() {
        let client = Principal::Client {
            scope: "read".parse().unwrap(),
        };

        assert!(client.has_scope("read"));
        assert!(!client.has_scope("manage_users"));
        assert_eq!(client.owner_type(), OwnerType::Client);
        assert_eq!(client.resolved_scopes(), "read".parse::<Scope>().unwrap());
    }

    #[test]
    fn owner_type_serialization() {
        assert_eq!(serde_json::to_string(&OwnerType::Client).unwrap(), "\"client\"");
        let user: OwnerType = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(user, OwnerType::User);
    }

    #[test]
    fn role_serialization() {
        let json = serde_json::to_string(&manager()).unwrap();
        assert_eq!(json, r#"{"name":"manager","scopes":"manage_users read"}"#);
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manager());
    }
}
