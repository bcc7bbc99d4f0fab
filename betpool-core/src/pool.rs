//! Pool records and per-user bet accounting.
//!
//! A pool is append-only for its lifetime: metadata is frozen at creation,
//! outcome totals only grow until settlement, and settlement itself is a
//! one-way transition recorded exactly once. Nothing is ever deleted, so the
//! id sequence doubles as an audit trail.

use serde::{Deserialize, Serialize};

use crate::{
    AccountId, PoolError, Result, MAX_DESCRIPTION_LEN, MAX_OUTCOME_LEN, MAX_TITLE_LEN,
};

/// Which resolution path closed the pool. All three converge on the same
/// settlement application so fee and payout math exists once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTrigger {
    /// Settled by the creator (or an admin via the enhanced path).
    Manual,
    /// Settled by weighted oracle consensus; carries the provider ids whose
    /// submissions participated, for fee distribution.
    Oracle { participants: Vec<u64> },
    /// Settled by the creator after automated resolution failed and the
    /// fallback delay elapsed.
    Fallback,
}

/// Settlement record, written exactly once per pool.
///
/// `net_pool` is fixed here and never recomputed: all later payout math
/// derives from this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Index of the winning outcome.
    pub winning_outcome: usize,
    /// Path that produced this settlement.
    pub trigger: ResolutionTrigger,
    /// Fee deducted from the gross pool, floored basis points.
    pub fee: u64,
    /// Gross pool minus fee; the base for every claim.
    pub net_pool: u64,
    /// Block height at which the pool settled.
    pub settled_at: u64,
    /// Payouts (claims, refunds, approved withdrawals) made before
    /// settlement; emergency withdrawal subtracts only post-settlement
    /// payouts from `net_pool`.
    pub prior_payouts: u64,
    /// Set when an upheld dispute overturns this settlement. Claim logic
    /// must consult this flag.
    pub overturned: bool,
}

/// A single prediction pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    /// Sequential id, starting at 0. Immutable.
    pub id: u64,
    /// Principal that created the pool.
    pub creator: AccountId,
    /// Pool question. Immutable after creation.
    pub title: String,
    /// Longer description. Immutable after creation.
    pub description: String,
    /// Outcome labels; index is the outcome id used everywhere else.
    pub outcomes: Vec<String>,
    /// Total staked per outcome, monotonically increasing until settlement.
    pub totals: Vec<u64>,
    /// Block height at creation.
    pub created_at: u64,
    /// Block height after which unsettled pools become refundable.
    pub expiry: u64,
    /// Present once the pool settled; one-way transition.
    pub settlement: Option<Settlement>,
    /// Cumulative funds paid out of escrow for this pool (claims, refunds,
    /// approved withdrawals, emergency withdrawal). Never decreases.
    pub paid_out: u64,
}

impl Pool {
    pub fn settled(&self) -> bool {
        self.settlement.is_some()
    }

    /// Sum of all outcome totals (the gross pool).
    pub fn gross(&self) -> u64 {
        self.totals.iter().sum()
    }

    pub fn expired(&self, now: u64) -> bool {
        now > self.expiry
    }

    /// Settlement record, or `NotSettled`.
    pub fn settlement(&self) -> Result<&Settlement> {
        self.settlement.as_ref().ok_or(PoolError::NotSettled(self.id))
    }

    /// Validate an outcome index against this pool.
    pub fn check_outcome(&self, outcome: usize) -> Result<()> {
        if outcome >= self.outcomes.len() {
            return Err(PoolError::InvalidOutcome);
        }
        Ok(())
    }
}

/// Validate pool creation fields. Each field failure has its own stable
/// error so callers can attribute the rejection.
pub fn validate_pool_fields(
    title: &str,
    description: &str,
    outcomes: &[&str],
    duration: u64,
) -> Result<()> {
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(PoolError::InvalidTitle);
    }
    if description.is_empty() || description.len() > MAX_DESCRIPTION_LEN {
        return Err(PoolError::InvalidDescription);
    }
    for outcome in outcomes {
        if outcome.is_empty() || outcome.len() > MAX_OUTCOME_LEN {
            return Err(PoolError::InvalidOutcome);
        }
    }
    if duration == 0 {
        return Err(PoolError::InvalidDuration);
    }
    Ok(())
}

/// Per-(pool, user) stake record. Created on first bet, incremented on
/// subsequent bets, decremented only by the admin-gated withdrawal path
/// (tracked through `withdrawn`, never below zero).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBet {
    /// Stake per outcome index.
    pub amounts: Vec<u64>,
    /// Total staked across outcomes.
    pub total: u64,
    /// Height of the user's first bet on this pool (early-bird window).
    pub first_bet_height: u64,
    /// Cumulative amount removed via approved withdrawal requests.
    pub withdrawn: u64,
}

impl UserBet {
    pub fn new(outcome_count: usize, height: u64) -> Self {
        Self {
            amounts: vec![0; outcome_count],
            total: 0,
            first_bet_height: height,
            withdrawn: 0,
        }
    }

    /// Stake still held in escrow for this user.
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.withdrawn)
    }

    /// Effective stake on `outcome` after withdrawals. Withdrawn funds are
    /// deducted from the queried side first, which can only understate a
    /// winner's share, never inflate it.
    pub fn effective_stake(&self, outcome: usize) -> u64 {
        self.amounts
            .get(outcome)
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.withdrawn)
    }
}

/// Read-only pool summary returned by `get_pool_stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub pool_id: u64,
    pub totals: Vec<u64>,
    pub gross: u64,
    pub bettor_count: u64,
    pub settled: bool,
    pub winning_outcome: Option<usize>,
    pub fee: Option<u64>,
    pub net_pool: Option<u64>,
    pub paid_out: u64,
    /// Escrow still attributable to this pool: gross minus fee minus
    /// payouts. Equals gross minus payouts while unsettled.
    pub remaining_escrow: u64,
}
