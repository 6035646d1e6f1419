//! Roles attached to users.
//!
//! Only user principals are ever looked up here, the scope of a client token is final.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::principal::Role;
use super::scope::Scope;

/// Provides the roles granted to a resource owner.
pub trait RoleRegistry {
    /// All roles attached to the user `owner_id`.
    ///
    /// Unknown owners have no roles. `Err(())` signals that the lookup itself failed.
    fn roles(&self, owner_id: &str) -> Result<Vec<Role>, ()>;
}

/// Keeps role definitions and user assignments in memory.
#[derive(Clone, Debug, Default)]
pub struct RoleMap {
    roles: HashMap<String, Scope>,
    assignments: HashMap<String, BTreeSet<String>>,
}

impl RoleMap {
    /// Create an empty registry.
    pub fn new() -> Self {
        RoleMap::default()
    }

    /// Define a role, replacing the scopes of an existing role with the same name.
    pub fn define_role(&mut self, role: Role) {
        self.roles.insert(role.name, role.scopes);
    }

    /// Remove a role and all of its assignments.
    pub fn remove_role(&mut self, name: &str) -> Option<Role> {
        let scopes = self.roles.remove(name)?;
        for assigned in self.assignments.values_mut() {
            assigned.remove(name);
        }
        Some(Role::new(name, scopes))
    }

    /// Attach a role to a user.
    ///
    /// Fails if the role has not been defined.
    pub fn assign(&mut self, owner_id: &str, role: &str) -> Result<(), ()> {
        if !self.roles.contains_key(role) {
            return Err(());
        }

        self.assignments
            .entry(owner_id.to_string())
            .or_insert_with(BTreeSet::new)
            .insert(role.to_string());
        Ok(())
    }

    /// Detach a role from a user, returning whether it was attached.
    pub fn unassign(&mut self, owner_id: &str, role: &str) -> bool {
        match self.assignments.get_mut(owner_id) {
            Some(assigned) => assigned.remove(role),
            None => false,
        }
    }
}

impl RoleRegistry for RoleMap {
    fn roles(&self, owner_id: &str) -> Result<Vec<Role>, ()> {
        let assigned = match self.assignments.get(owner_id) {
            Some(assigned) => assigned,
            None => return Ok(Vec::new()),
        };

        Ok(assigned
            .iter()
            .filter_map(|name| {
                self.roles
                    .get(name)
                    .map(|scopes| Role::new(name, scopes.clone()))
            })
            .collect())
    }
}

impl<'s, R: RoleRegistry + ?Sized> RoleRegistry for &'s R {
    fn roles(&self, owner_id: &str) -> Result<Vec<Role>, ()> {
        (**self).roles(owner_id)
    }
}

impl<R: RoleRegistry + ?Sized> RoleRegistry for Box<R> {
    fn roles(&self, owner_id: &str) -> Result<Vec<Role>, ()> {
        (**self).roles(owner_id)
    }
}

impl<R: RoleRegistry + ?Sized> RoleRegistry for Arc<R> {
    fn roles(&self, owner_id: &str) -> Result<Vec<Role>, ()> {
        (**self).roles(owner_id)
    }
}
