//! Append-only event log.
//!
//! Every state transition records one event; the log is never truncated and
//! is mirrored to `tracing` for observability. Off-chain tooling replays the
//! log instead of polling individual records.

use serde::{Deserialize, Serialize};

use crate::{AccountId, ResolutionTrigger};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    PoolCreated {
        pool_id: u64,
        creator: AccountId,
        expiry: u64,
    },
    BetRecorded {
        pool_id: u64,
        user: AccountId,
        outcome: usize,
        amount: u64,
    },
    PoolSettled {
        pool_id: u64,
        winning_outcome: usize,
        trigger: ResolutionTrigger,
        fee: u64,
        net_pool: u64,
    },
    WinningsClaimed {
        pool_id: u64,
        user: AccountId,
        base: u64,
        bonus: u64,
    },
    RefundIssued {
        pool_id: u64,
        user: AccountId,
        amount: u64,
    },
    WithdrawalRequested {
        withdrawal_id: u64,
        pool_id: u64,
        user: AccountId,
        amount: u64,
    },
    WithdrawalApproved {
        withdrawal_id: u64,
    },
    WithdrawalRejected {
        withdrawal_id: u64,
    },
    EmergencyWithdrawal {
        pool_id: u64,
        creator: AccountId,
        amount: u64,
    },
    OracleRegistered {
        provider_id: u64,
        principal: AccountId,
    },
    OracleDataSubmitted {
        pool_id: u64,
        provider_id: u64,
        value: u64,
        confidence: u8,
    },
    ResolutionConfigured {
        pool_id: u64,
        sources: Vec<u64>,
    },
    ResolutionAttempted {
        pool_id: u64,
        decisive: bool,
    },
    FallbackTriggered {
        pool_id: u64,
        reason: String,
    },
    ResolutionFeeCollected {
        pool_id: u64,
        amount: u64,
    },
    OracleFeeClaimed {
        pool_id: u64,
        provider_id: u64,
        amount: u64,
    },
    DisputeCreated {
        dispute_id: u64,
        pool_id: u64,
        disputer: AccountId,
        bond: u64,
        voting_deadline: u64,
    },
    DisputeVoteCast {
        dispute_id: u64,
        voter: AccountId,
        in_favor: bool,
    },
    DisputeResolved {
        dispute_id: u64,
        upheld: bool,
    },
    ReferralRegistered {
        user: AccountId,
        referrer: AccountId,
    },
}
