//! Recovers the grant behind a bearer token.
//!
//! Issuing tokens is the business of the authorization server. A protected resource only needs
//! to look up what an access token it received stands for, which is what the [`Issuer`] trait
//! provides. [`TokenMap`] keeps the grants of imported tokens in memory and allows revoking them.
//!
//! [`Issuer`]: trait.Issuer.html
//! [`TokenMap`]: struct.TokenMap.html
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::debug;

use super::grant::Grant;

/// Looks up the grants corresponding to access tokens.
pub trait Issuer {
    /// Get the values corresponding to a bearer token.
    ///
    /// Returns `Ok(None)` for unknown tokens and `Err(())` if the lookup itself failed.
    fn recover_token<'a>(&'a self, _: &'a str) -> Result<Option<Grant>, ()>;
}

/// Keeps track of access tokens by a hash-map.
#[derive(Default)]
pub struct TokenMap {
    duration: Option<Duration>,
    access: HashMap<Arc<str>, Grant>,
}

impl TokenMap {
    /// Construct an empty `TokenMap`.
    pub fn new() -> Self {
        TokenMap::default()
    }

    /// Set the validity of all imported grants to the specified duration.
    pub fn valid_for(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    /// All grants keep the expiration time they were imported with.
    pub fn valid_for_default(&mut self) {
        self.duration = None;
    }

    /// Directly associate token with grant.
    ///
    /// No checks on the validity of the grant are performed but the expiration time of the grant
    /// is modified (if a `duration` was previously set).
    pub fn import_grant(&mut self, token: String, mut grant: Grant) {
        if let Some(duration) = &self.duration {
            grant.until = Utc::now() + *duration;
        }

        self.access.insert(Arc::from(token), grant);
    }

    /// Unconditionally delete grant associated with the token.
    ///
    /// Returns whether a grant was known for the token. Later lookups of the token find nothing.
    pub fn revoke(&mut self, token: &str) -> bool {
        let known = self.access.remove(token).is_some();
        debug!("Revoked access token, known: {}", known);
        known
    }

    /// The number of tokens currently known.
    pub fn len(&self) -> usize {
        self.access.len()
    }

    /// True if no token is known.
    pub fn is_empty(&self) -> bool {
        self.access.is_empty()
    }
}

impl Issuer for TokenMap {
    fn recover_token<'a>(&'a self, token: &'a str) -> Result<Option<Grant>, ()> {
        Ok(self.access.get(token).cloned())
    }
}

impl<'s, I: Issuer + ?Sized> Issuer for &'s I {
    fn recover_token<'a>(&'a self, token: &'a str) -> Result<Option<Grant>, ()> {
        (**self).recover_token(token)
    }
}

impl<I: Issuer + ?Sized> Issuer for Box<I> {
    fn recover_token<'a>(&'a self, token: &'a str) -> Result<Option<Grant>, ()> {
        (**self).recover_token(token)
    }
}

impl<I: Issuer + ?Sized> Issuer for Arc<I> {
    fn recover_token<'a>(&'a self, token: &'a str) -> Result<Option<Grant>, ()> {
        (**self).recover_token(token)
    }
}
