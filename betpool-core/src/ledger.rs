//! Ledger adapter: the engine's only window onto user funds.
//!
//! The surrounding chain executes every entrypoint as one atomic, serially
//! ordered transaction, so the adapter only needs three primitives: a
//! monotonically increasing block-height clock, balance queries, and an
//! all-or-nothing transfer. The engine performs at most one transfer per
//! entrypoint and always validates preconditions first, so a failed transfer
//! never leaves partial state behind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AccountId;

/// Errors surfaced by a [`Ledger`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// Source account cannot cover the transfer
    #[error("insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: AccountId,
        needed: u64,
        available: u64,
    },
}

/// Atomic value-transfer primitive provided by the surrounding chain.
pub trait Ledger {
    /// Current block height; strictly monotonic between transactions.
    fn block_height(&self) -> u64;

    /// Spendable balance of an account. Unknown accounts hold zero.
    fn balance(&self, account: &str) -> u64;

    /// Move `amount` from `from` to `to`, atomically. Either the full
    /// amount moves or nothing does.
    fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), LedgerError>;
}

/// Deterministic in-memory ledger used by tests and the CLI demo.
///
/// Block height only moves when [`MemoryLedger::advance`] is called, which
/// makes window and deadline arithmetic reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: HashMap<AccountId, u64>,
    height: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account out of thin air (test/demo setup only).
    pub fn fund(&mut self, account: &str, amount: u64) {
        *self.balances.entry(account.to_string()).or_insert(0) += amount;
    }

    /// Advance the block-height clock by `blocks`.
    pub fn advance(&mut self, blocks: u64) {
        self.height += blocks;
    }
}

impl Ledger for MemoryLedger {
    fn block_height(&self) -> u64 {
        self.height
    }

    fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.to_string(),
                needed: amount,
                available,
            });
        }
        *self.balances.entry(from.to_string()).or_insert(0) -= amount;
        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_exact_amount() {
        let mut ledger = MemoryLedger::new();
        ledger.fund("alice", 1_000);
        ledger.transfer("alice", "bob", 400).unwrap();
        assert_eq!(ledger.balance("alice"), 600);
        assert_eq!(ledger.balance("bob"), 400);
    }

    #[test]
    fn transfer_rejects_overdraft_without_side_effects() {
        let mut ledger = MemoryLedger::new();
        ledger.fund("alice", 100);
        let err = ledger.transfer("alice", "bob", 101).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: "alice".to_string(),
                needed: 101,
                available: 100,
            }
        );
        assert_eq!(ledger.balance("alice"), 100);
        assert_eq!(ledger.balance("bob"), 0);
    }

    #[test]
    fn height_only_moves_on_advance() {
        let mut ledger = MemoryLedger::new();
        assert_eq!(ledger.block_height(), 0);
        ledger.advance(100);
        assert_eq!(ledger.block_height(), 100);
    }
}
