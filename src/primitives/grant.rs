//! The data recovered for a bearer token.
use chrono::Utc;

use super::Time;
use super::principal::OwnerType;
use super::scope::Scope;

/// Owning copy of a grant.
///
/// This is what the token storage hands back for an access token. It can be stored without
/// worrying about lifetimes or shared across thread boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    /// Identifies the owner of the resource.
    pub owner_id: String,

    /// Whether the owner is the client itself or a user.
    pub owner_type: OwnerType,

    /// Identifies the client to which the grant was issued.
    pub client_id: String,

    /// The scope granted to the client.
    pub scope: Scope,

    /// Expiration date of the grant (Utc).
    pub until: Time,
}

impl Grant {
    /// Determine if the grant is no longer valid at the current time.
    pub fn is_expired(&self) -> bool {
        self.until < Utc::now()
    }
}
