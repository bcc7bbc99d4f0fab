//! The pool engine: owns every record for its lifetime and exposes the
//! entrypoint ABI.
//!
//! This module carries the Pool Registry and Betting Ledger entrypoints plus
//! the read-only queries; settlement, oracle resolution, disputes and claims
//! live in their sibling modules as further `impl` blocks on [`PoolEngine`].
//!
//! Entrypoints take the calling principal explicitly: the surrounding chain
//! authenticates callers and serializes calls, the engine only checks
//! authorization and state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    access::AccessControl,
    claims::WithdrawalRequest,
    dispute::Dispute,
    events::PoolEvent,
    ledger::{Ledger, LedgerError},
    oracle::{OracleProvider, OracleSubmission, ResolutionConfig},
    pool::{validate_pool_fields, Pool, PoolStats, UserBet},
    settle::ResolutionFees,
    AccountId, PoolError, Result, MIN_BET_AMOUNT,
};

/// Contract-side account names the engine moves funds between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineAccounts {
    /// Custody account holding all escrowed stakes and bonds.
    pub escrow: AccountId,
    /// Incentive reserve the claim bonuses are paid from; funded by the
    /// platform, never by pool stakes.
    pub reserve: AccountId,
}

impl Default for EngineAccounts {
    fn default() -> Self {
        Self {
            escrow: "betpool-escrow".to_string(),
            reserve: "betpool-reserve".to_string(),
        }
    }
}

/// Pool settlement and escrow engine.
///
/// Generic over the [`Ledger`] adapter; all state lives in arena-style maps
/// keyed by monotonically increasing ids and is never deleted, only marked
/// terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEngine<L> {
    pub(crate) ledger: L,
    pub(crate) accounts: EngineAccounts,
    pub(crate) access: AccessControl,

    pub(crate) pools: BTreeMap<u64, Pool>,
    pub(crate) next_pool_id: u64,
    /// Keyed by (pool id, bettor). Serialized as an entry list since JSON
    /// map keys must be strings.
    #[serde(with = "bet_entries")]
    pub(crate) bets: BTreeMap<(u64, AccountId), UserBet>,
    pub(crate) claimed: BTreeSet<(u64, AccountId)>,

    pub(crate) withdrawals: BTreeMap<u64, WithdrawalRequest>,
    pub(crate) next_withdrawal_id: u64,

    pub(crate) disputes: BTreeMap<u64, Dispute>,
    pub(crate) next_dispute_id: u64,

    pub(crate) providers: BTreeMap<u64, OracleProvider>,
    pub(crate) next_provider_id: u64,
    pub(crate) submissions: Vec<OracleSubmission>,
    pub(crate) configs: BTreeMap<u64, ResolutionConfig>,
    pub(crate) resolution_fees: BTreeMap<u64, ResolutionFees>,

    pub(crate) referrers: BTreeMap<AccountId, AccountId>,
    pub(crate) events: Vec<PoolEvent>,
}

mod bet_entries {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<(u64, AccountId), UserBet>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<(u64, AccountId), UserBet>, D::Error> {
        let entries: Vec<((u64, AccountId), UserBet)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl<L: Ledger> PoolEngine<L> {
    pub fn new(ledger: L, accounts: EngineAccounts, owner: AccountId) -> Self {
        Self {
            ledger,
            accounts,
            access: AccessControl::new(owner),
            pools: BTreeMap::new(),
            next_pool_id: 0,
            bets: BTreeMap::new(),
            claimed: BTreeSet::new(),
            withdrawals: BTreeMap::new(),
            next_withdrawal_id: 0,
            disputes: BTreeMap::new(),
            next_dispute_id: 0,
            providers: BTreeMap::new(),
            next_provider_id: 0,
            submissions: Vec::new(),
            configs: BTreeMap::new(),
            resolution_fees: BTreeMap::new(),
            referrers: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Current block height as reported by the ledger adapter.
    pub fn block_height(&self) -> u64 {
        self.ledger.block_height()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub(crate) fn emit(&mut self, event: PoolEvent) {
        info!(?event, "pool event");
        self.events.push(event);
    }

    /// Escrow funds from a caller. Maps the adapter failure to
    /// `InsufficientBalance` (the caller's problem).
    pub(crate) fn escrow_in(&mut self, from: &str, amount: u64) -> Result<()> {
        let escrow = self.accounts.escrow.clone();
        self.ledger
            .transfer(from, &escrow, amount)
            .map_err(|LedgerError::InsufficientFunds {
                needed, available, ..
            }| PoolError::InsufficientBalance { needed, available })
    }

    /// Pay funds out of escrow. Maps the adapter failure to
    /// `InsufficientContractBalance` (the contract's problem).
    pub(crate) fn escrow_out(&mut self, to: &str, amount: u64) -> Result<()> {
        let escrow = self.accounts.escrow.clone();
        self.ledger
            .transfer(&escrow, to, amount)
            .map_err(|LedgerError::InsufficientFunds {
                needed, available, ..
            }| PoolError::InsufficientContractBalance { needed, available })
    }

    pub(crate) fn pool(&self, pool_id: u64) -> Result<&Pool> {
        self.pools.get(&pool_id).ok_or(PoolError::PoolNotFound(pool_id))
    }

    pub(crate) fn pool_mut(&mut self, pool_id: u64) -> Result<&mut Pool> {
        self.pools
            .get_mut(&pool_id)
            .ok_or(PoolError::PoolNotFound(pool_id))
    }

    // --- Pool Registry -----------------------------------------------------

    /// Create a binary pool. Returns the new sequential pool id.
    ///
    /// Expiry is `current height + duration`; totals start zeroed.
    pub fn create_pool(
        &mut self,
        caller: &str,
        title: &str,
        description: &str,
        outcome_a: &str,
        outcome_b: &str,
        duration: u64,
    ) -> Result<u64> {
        validate_pool_fields(title, description, &[outcome_a, outcome_b], duration)?;

        let now = self.ledger.block_height();
        let id = self.next_pool_id;
        let pool = Pool {
            id,
            creator: caller.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            outcomes: vec![outcome_a.to_string(), outcome_b.to_string()],
            totals: vec![0, 0],
            created_at: now,
            expiry: now + duration,
            settlement: None,
            paid_out: 0,
        };
        let expiry = pool.expiry;
        self.pools.insert(id, pool);
        self.next_pool_id += 1;

        self.emit(PoolEvent::PoolCreated {
            pool_id: id,
            creator: caller.to_string(),
            expiry,
        });
        Ok(id)
    }

    // --- Betting Ledger ----------------------------------------------------

    /// Place a bet: escrow `amount` from the caller and credit the chosen
    /// outcome.
    pub fn place_bet(
        &mut self,
        caller: &str,
        pool_id: u64,
        outcome: usize,
        amount: u64,
    ) -> Result<()> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        if pool.expired(now) {
            return Err(PoolError::PoolExpired(pool_id));
        }
        pool.check_outcome(outcome)?;
        if amount == 0 || amount < MIN_BET_AMOUNT {
            return Err(PoolError::InvalidAmount(amount));
        }
        let outcome_count = pool.outcomes.len();

        // Preconditions done; the transfer is the only fallible step left.
        self.escrow_in(caller, amount)?;

        let pool = self.pools.get_mut(&pool_id).expect("checked above");
        pool.totals[outcome] += amount;
        let bet = self
            .bets
            .entry((pool_id, caller.to_string()))
            .or_insert_with(|| UserBet::new(outcome_count, now));
        bet.amounts[outcome] += amount;
        bet.total += amount;

        self.emit(PoolEvent::BetRecorded {
            pool_id,
            user: caller.to_string(),
            outcome,
            amount,
        });
        Ok(())
    }

    /// `place_bet` with a spendable-balance pre-check for better error
    /// attribution. Same economics as [`PoolEngine::place_bet`].
    pub fn place_bet_validated(
        &mut self,
        caller: &str,
        pool_id: u64,
        outcome: usize,
        amount: u64,
    ) -> Result<()> {
        let available = self.ledger.balance(caller);
        if available < amount {
            return Err(PoolError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.place_bet(caller, pool_id, outcome, amount)
    }

    /// The strictest betting entrypoint: pre-checks the spendable balance and
    /// rejects amounts that would overflow the pool totals. Same economics as
    /// [`PoolEngine::place_bet`].
    pub fn place_bet_safe(
        &mut self,
        caller: &str,
        pool_id: u64,
        outcome: usize,
        amount: u64,
    ) -> Result<()> {
        let available = self.ledger.balance(caller);
        if available < amount {
            return Err(PoolError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let pool = self.pool(pool_id)?;
        let overflows = pool
            .totals
            .get(outcome)
            .is_some_and(|total| total.checked_add(amount).is_none())
            || pool.gross().checked_add(amount).is_none();
        if overflows {
            return Err(PoolError::InvalidAmount(amount));
        }
        self.place_bet(caller, pool_id, outcome, amount)
    }

    // --- Access control ----------------------------------------------------

    pub fn is_admin(&self, who: &str) -> bool {
        self.access.is_admin(who)
    }

    pub fn add_admin(&mut self, caller: &str, who: &str) -> Result<()> {
        self.access.add_admin(caller, who)
    }

    pub fn remove_admin(&mut self, caller: &str, who: &str) -> Result<()> {
        self.access.remove_admin(caller, who)
    }

    /// Register `referrer` as the caller's referrer, once.
    pub fn register_referral(&mut self, caller: &str, referrer: &str) -> Result<()> {
        if caller == referrer {
            return Err(PoolError::InvalidCriteria(
                "cannot refer yourself".to_string(),
            ));
        }
        if self.referrers.contains_key(caller) {
            return Err(PoolError::AlreadyConfigured(format!(
                "referral for {caller}"
            )));
        }
        self.referrers
            .insert(caller.to_string(), referrer.to_string());
        self.emit(PoolEvent::ReferralRegistered {
            user: caller.to_string(),
            referrer: referrer.to_string(),
        });
        Ok(())
    }

    // --- Read-only queries -------------------------------------------------

    pub fn get_pool(&self, pool_id: u64) -> Option<&Pool> {
        self.pools.get(&pool_id)
    }

    pub fn get_user_bet(&self, pool_id: u64, user: &str) -> Option<&UserBet> {
        self.bets.get(&(pool_id, user.to_string()))
    }

    pub fn get_pool_stats(&self, pool_id: u64) -> Result<PoolStats> {
        let pool = self.pool(pool_id)?;
        let gross = pool.gross();
        let bettor_count = self
            .bets
            .keys()
            .filter(|(id, _)| *id == pool_id)
            .count() as u64;
        let fee = pool.settlement.as_ref().map(|s| s.fee);
        Ok(PoolStats {
            pool_id,
            totals: pool.totals.clone(),
            gross,
            bettor_count,
            settled: pool.settled(),
            winning_outcome: pool.settlement.as_ref().map(|s| s.winning_outcome),
            fee,
            net_pool: pool.settlement.as_ref().map(|s| s.net_pool),
            paid_out: pool.paid_out,
            remaining_escrow: gross
                .saturating_sub(fee.unwrap_or(0))
                .saturating_sub(pool.paid_out),
        })
    }

    /// Paginated pool listing in id order.
    pub fn list_pools(&self, offset: u64, limit: usize) -> Vec<&Pool> {
        self.pools
            .range(offset..)
            .take(limit)
            .map(|(_, pool)| pool)
            .collect()
    }

    pub fn pool_count(&self) -> u64 {
        self.next_pool_id
    }

    /// Full append-only event log.
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }
}
