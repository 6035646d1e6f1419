use chrono::{Duration, Utc};

use oxide_auth_scope::primitives::grant::Grant;
use oxide_auth_scope::primitives::issuer::TokenMap;
use oxide_auth_scope::primitives::principal::{OwnerType, Role};
use oxide_auth_scope::primitives::roles::RoleMap;

pub mod defaults {
    pub const EXAMPLE_CLIENT_ID: &str = "ClientId";
    pub const EXAMPLE_OWNER_ID: &str = "Owner";
    pub const CLIENT_TOKEN: &str = "ClientToken";
    pub const USER_TOKEN: &str = "UserToken";
    pub const EXPIRED_TOKEN: &str = "ExpiredToken";
    pub const EXAMPLE_SCOPE: &str = "read";
    pub const ADMIN_ROLE: &str = "admin";
    pub const ADMIN_SCOPE: &str = "manage_users";
}

use self::defaults::*;

/// Tokens for a client, a user and an expired user grant, all with the example scope.
pub fn tokens() -> TokenMap {
    let mut tokens = TokenMap::new();
    tokens.import_grant(CLIENT_TOKEN.to_string(), grant(OwnerType::Client, EXAMPLE_CLIENT_ID, 1));
    tokens.import_grant(USER_TOKEN.to_string(), grant(OwnerType::User, EXAMPLE_OWNER_ID, 1));
    tokens.import_grant(EXPIRED_TOKEN.to_string(), grant(OwnerType::User, EXAMPLE_OWNER_ID, -1));
    tokens
}

/// The admin role, granting the admin scope, attached to the example owner and to the client id.
pub fn roles() -> RoleMap {
    let mut roles = RoleMap::new();
    roles.define_role(Role::new(ADMIN_ROLE, ADMIN_SCOPE.parse().unwrap()));
    roles.assign(EXAMPLE_OWNER_ID, ADMIN_ROLE).unwrap();
    roles.assign(EXAMPLE_CLIENT_ID, ADMIN_ROLE).unwrap();
    roles
}

fn grant(owner_type: OwnerType, owner_id: &str, hours: i64) -> Grant {
    Grant {
        owner_id: owner_id.to_string(),
        owner_type,
        client_id: EXAMPLE_CLIENT_ID.to_string(),
        scope: EXAMPLE_SCOPE.parse().unwrap(),
        until: Utc::now() + Duration::hours(hours),
    }
}
