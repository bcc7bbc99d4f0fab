//! Error types for betpool-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Error types for pool operations.
///
/// The set is closed and every variant carries a stable numeric code
/// (see [`PoolError::code`]) grouped by cause: validation (1xx),
/// authorization (2xx), state-conflict (3xx), not-found (4xx),
/// timing (5xx) and funds (6xx). Every failing entrypoint returns one of
/// these and leaves engine state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolError {
    /// Pool title empty or over the maximum length
    #[error("invalid title")]
    InvalidTitle,

    /// Pool description empty or over the maximum length
    #[error("invalid description")]
    InvalidDescription,

    /// Outcome label invalid, or outcome index out of range
    #[error("invalid outcome")]
    InvalidOutcome,

    /// Pool duration must be greater than zero
    #[error("invalid duration")]
    InvalidDuration,

    /// Bet amount zero or below the configured minimum
    #[error("invalid amount: {0}")]
    InvalidAmount(u64),

    /// Malformed resolution criteria, confidence or referral input
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Caller is not the creator, owner or an admin
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Pool already settled
    #[error("pool {0} already settled")]
    PoolSettled(u64),

    /// Pool not yet settled
    #[error("pool {0} not settled")]
    NotSettled(u64),

    /// Caller already claimed winnings or a refund for this pool
    #[error("already claimed for pool {0}")]
    AlreadyClaimed(u64),

    /// Dispute window (or dispute voting window) has closed
    #[error("dispute period expired for pool {0}")]
    DisputePeriodExpired(u64),

    /// Caller already voted on this dispute
    #[error("already voted on dispute {0}")]
    AlreadyVoted(u64),

    /// Dispute already resolved
    #[error("dispute {0} already concluded")]
    DisputeConcluded(u64),

    /// Settlement was overturned by a dispute; claims are frozen
    #[error("settlement overturned for pool {0}")]
    SettlementOverturned(u64),

    /// Resolution already configured (or referral already registered)
    #[error("already configured: {0}")]
    AlreadyConfigured(String),

    /// Oracle provider is deactivated
    #[error("oracle provider {0} inactive")]
    ProviderInactive(u64),

    /// Resolution fee already collected or claimed
    #[error("resolution fee already claimed for pool {0}")]
    FeeAlreadyClaimed(u64),

    /// Automated resolution retry budget exhausted
    #[error("resolution retries exhausted for pool {0}")]
    RetriesExhausted(u64),

    /// Fallback resolution not triggered or its preconditions unmet
    #[error("fallback resolution not ready for pool {0}")]
    FallbackNotReady(u64),

    /// Withdrawal request already approved or rejected
    #[error("withdrawal {0} already concluded")]
    WithdrawalConcluded(u64),

    /// Unknown pool id
    #[error("pool {0} not found")]
    PoolNotFound(u64),

    /// Unknown dispute id
    #[error("dispute {0} not found")]
    DisputeNotFound(u64),

    /// Unknown withdrawal request id
    #[error("withdrawal {0} not found")]
    WithdrawalNotFound(u64),

    /// Unknown oracle provider
    #[error("oracle provider not found: {0}")]
    ProviderNotFound(String),

    /// No resolution configuration attached to the pool
    #[error("no resolution config for pool {0}")]
    ConfigNotFound(u64),

    /// Caller has no recorded stake in the pool
    #[error("no bet found for pool {0}")]
    BetNotFound(u64),

    /// Pool has not reached its expiry height yet
    #[error("pool {0} not expired")]
    PoolNotExpired(u64),

    /// Dispute voting deadline has not passed yet
    #[error("voting not concluded for dispute {0}")]
    VotingNotConcluded(u64),

    /// Fallback delay still running
    #[error("fallback delay active for pool {0}")]
    FallbackDelayActive(u64),

    /// Pool expired; no further bets accepted
    #[error("pool {0} expired")]
    PoolExpired(u64),

    /// Caller's spendable balance is below the requested amount
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Requested withdrawal exceeds the caller's remaining stake
    #[error("withdrawal exceeds stake: requested {requested}, staked {staked}")]
    WithdrawalExceedsStake { requested: u64, staked: u64 },

    /// Contract escrow cannot cover the transfer
    #[error("insufficient contract balance: need {needed}, have {available}")]
    InsufficientContractBalance { needed: u64, available: u64 },

    /// Caller staked nothing on the winning outcome
    #[error("no winnings for pool {0}")]
    NoWinnings(u64),
}

impl PoolError {
    /// Stable numeric code for the error, part of the public ABI.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidTitle => 100,
            Self::InvalidDescription => 101,
            Self::InvalidOutcome => 102,
            Self::InvalidDuration => 103,
            Self::InvalidAmount(_) => 104,
            Self::InvalidCriteria(_) => 105,
            Self::Unauthorized(_) => 200,
            Self::PoolSettled(_) => 300,
            Self::NotSettled(_) => 301,
            Self::AlreadyClaimed(_) => 302,
            Self::DisputePeriodExpired(_) => 303,
            Self::AlreadyVoted(_) => 304,
            Self::DisputeConcluded(_) => 305,
            Self::SettlementOverturned(_) => 306,
            Self::AlreadyConfigured(_) => 307,
            Self::ProviderInactive(_) => 308,
            Self::FeeAlreadyClaimed(_) => 309,
            Self::RetriesExhausted(_) => 310,
            Self::FallbackNotReady(_) => 311,
            Self::WithdrawalConcluded(_) => 312,
            Self::PoolNotFound(_) => 400,
            Self::DisputeNotFound(_) => 401,
            Self::WithdrawalNotFound(_) => 402,
            Self::ProviderNotFound(_) => 403,
            Self::ConfigNotFound(_) => 404,
            Self::BetNotFound(_) => 405,
            Self::PoolNotExpired(_) => 500,
            Self::VotingNotConcluded(_) => 501,
            Self::FallbackDelayActive(_) => 502,
            Self::PoolExpired(_) => 503,
            Self::InsufficientBalance { .. } => 600,
            Self::WithdrawalExceedsStake { .. } => 601,
            Self::InsufficientContractBalance { .. } => 602,
            Self::NoWinnings(_) => 603,
        }
    }
}
