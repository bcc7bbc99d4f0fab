//! # Betpool Core
//!
//! Core Rust library for peer-funded prediction pools: users create pools,
//! stake funds on outcomes, and receive a pro-rata share of the losing side's
//! stake (minus a platform fee) once a pool is resolved.
//!
//! This library is the pool settlement and escrow engine:
//! - **Pool Registry**: create pools with validated, immutable metadata
//! - **Betting Ledger**: per-(pool, user) stake accounting while a pool is open
//! - **Settlement Engine**: manual settlement with exact fee extraction
//! - **Oracle Subsystem**: weighted-consensus automated resolution with a
//!   fallback path
//! - **Dispute Subsystem**: post-settlement challenges resolved by community
//!   vote
//! - **Claims & Withdrawals**: at-most-once claims, expiry refunds and
//!   admin-gated withdrawals
//!
//! Funds live in an external ledger behind the [`Ledger`] trait; the engine
//! only ever asks it for atomic transfers, balances and the current block
//! height. Every entrypoint either fully commits or returns a typed
//! [`PoolError`] and leaves state unchanged.
//!
//! ## Examples
//!
//! ```rust
//! use betpool_core::{EngineAccounts, MemoryLedger, PoolEngine, MIN_BET_AMOUNT};
//!
//! let mut ledger = MemoryLedger::new();
//! ledger.fund("alice", 10_000_000);
//! ledger.fund("bob", 10_000_000);
//!
//! let mut engine = PoolEngine::new(ledger, EngineAccounts::default(), "owner".to_string());
//! let pool_id = engine.create_pool(
//!     "creator",
//!     "Who wins the final?",
//!     "Best-of-five grand final",
//!     "Team A",
//!     "Team B",
//!     100,
//! )?;
//!
//! engine.place_bet("alice", pool_id, 0, 1_000_000)?;
//! engine.place_bet("bob", pool_id, 1, 1_000_000)?;
//! engine.settle_pool("creator", pool_id, 0)?;
//! let payout = engine.claim_winnings("alice", pool_id)?;
//! assert_eq!(payout.base, 1_960_000);
//! Ok::<(), betpool_core::PoolError>(())
//! ```

pub mod access;
pub mod claims;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod pool;
pub mod settle;
pub mod test_utils;

pub use access::AccessControl;
pub use claims::{ClaimPayout, WithdrawalRequest, WithdrawalStatus};
pub use dispute::{Dispute, DisputeResolution};
pub use engine::{EngineAccounts, PoolEngine};
pub use error::{PoolError, Result};
pub use events::PoolEvent;
pub use ledger::{Ledger, LedgerError, MemoryLedger};
pub use oracle::{
    Combinator, Comparison, OracleProvider, OracleSubmission, ResolutionConfig, ResolutionOutcome,
    ResolutionState,
};
pub use pool::{Pool, PoolStats, ResolutionTrigger, Settlement, UserBet};
pub use settle::SettlementStats;

/// Account identifier of an external principal or a contract bucket.
pub type AccountId = String;

/// Basis-point denominator used by all fee and bonus arithmetic.
pub const BPS_DENOM: u64 = 10_000;

/// Platform fee taken at settlement (2%).
pub const FEE_BPS: u64 = 200;

/// Reduced fee applied by the fallback resolution path (1%).
pub const FALLBACK_FEE_BPS: u64 = 100;

/// Minimum bet amount in base units.
pub const MIN_BET_AMOUNT: u64 = 1_000;

/// Maximum pool title length in bytes.
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum pool description (and dispute reason) length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum outcome label length in bytes.
pub const MAX_OUTCOME_LEN: usize = 50;

/// Blocks after pool creation during which a first bet earns the
/// early-bird bonus.
pub const EARLY_BIRD_WINDOW: u64 = 50;

/// Early-bird bonus, in basis points of the base payout (5%).
pub const EARLY_BIRD_BONUS_BPS: u64 = 500;

/// Volume bonus, in basis points of the base payout (2%).
pub const VOLUME_BONUS_BPS: u64 = 200;

/// Total stake at or above which a claim earns the volume bonus.
pub const VOLUME_BONUS_THRESHOLD: u64 = 1_000_000;

/// Referral bonus paid to the referrer, in basis points of the base payout.
pub const REFERRAL_BONUS_BPS: u64 = 100;

/// Blocks after settlement during which a dispute may be opened.
pub const DISPUTE_WINDOW: u64 = 100;

/// Dispute bond, in basis points of the gross pool (5%).
pub const DISPUTE_BOND_BPS: u64 = 500;

/// Blocks from dispute creation to the voting deadline.
pub const DISPUTE_VOTING_PERIOD: u64 = 1_000;

/// Blocks the fallback path must wait after being triggered.
pub const FALLBACK_DELAY: u64 = 144;

/// Minimum combined weight (reliability x confidence) an `Or` consensus
/// needs before it is considered decisive.
pub const MIN_CONSENSUS_WEIGHT: u64 = 5_000;

/// Reliability score assigned to freshly registered oracle providers.
pub const DEFAULT_PROVIDER_RELIABILITY: u8 = 80;

/// Multiply an amount by basis points, flooring, without intermediate
/// overflow.
pub const fn bps_of(amount: u64, bps: u64) -> u64 {
    (amount as u128 * bps as u128 / BPS_DENOM as u128) as u64
}

/// Proportional share `stake / side_total * pool`, floored.
pub fn pro_rata(stake: u64, side_total: u64, pool: u64) -> u64 {
    if side_total == 0 {
        return 0;
    }
    (stake as u128 * pool as u128 / side_total as u128) as u64
}

/// SHA-256 digest of arbitrary evidence bytes, hex-encoded.
pub fn evidence_digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
