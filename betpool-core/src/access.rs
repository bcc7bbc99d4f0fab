//! Platform access control: one owner, an explicit admin set.
//!
//! Modeled as an aggregate owned by the engine rather than ambient globals,
//! so authorization checks are ordinary method calls on engine state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AccountId, PoolError, Result};

/// Owner plus admin set. The owner is implicitly an admin and the only
/// principal allowed to mutate the set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    owner: AccountId,
    admins: BTreeSet<AccountId>,
}

impl AccessControl {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            admins: BTreeSet::new(),
        }
    }

    /// Platform owner, the fee recipient.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owner(&self, who: &str) -> bool {
        self.owner == who
    }

    pub fn is_admin(&self, who: &str) -> bool {
        self.is_owner(who) || self.admins.contains(who)
    }

    pub fn add_admin(&mut self, caller: &str, who: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.admins.insert(who.to_string());
        Ok(())
    }

    pub fn remove_admin(&mut self, caller: &str, who: &str) -> Result<()> {
        self.require_owner(caller)?;
        self.admins.remove(who);
        Ok(())
    }

    pub fn require_owner(&self, caller: &str) -> Result<()> {
        if !self.is_owner(caller) {
            return Err(PoolError::Unauthorized(format!("{caller} is not the owner")));
        }
        Ok(())
    }

    pub fn require_admin(&self, caller: &str) -> Result<()> {
        if !self.is_admin(caller) {
            return Err(PoolError::Unauthorized(format!("{caller} is not an admin")));
        }
        Ok(())
    }
}
