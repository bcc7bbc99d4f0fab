//! Common test utilities for betpool-core tests.
//!
//! Shared fixtures across all modules: a funded in-memory ledger, a ready
//! engine and standard principals, so individual tests only spell out the
//! behavior under test.

use crate::{EngineAccounts, MemoryLedger, PoolEngine};

pub type TestEngine = PoolEngine<MemoryLedger>;

/// Standard principals used across tests.
pub const OWNER: &str = "owner";
pub const CREATOR: &str = "creator";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";
pub const ORACLE_1: &str = "oracle-1";
pub const ORACLE_2: &str = "oracle-2";

/// Contract bucket names matching [`EngineAccounts::default`].
pub const ESCROW: &str = "betpool-escrow";
pub const RESERVE: &str = "betpool-reserve";

/// Stake every standard principal starts with.
pub const STARTING_BALANCE: u64 = 10_000_000;

/// Incentive reserve funding in the default fixture.
pub const RESERVE_FUNDS: u64 = 1_000_000;

/// Duration used by [`create_test_pool`].
pub const TEST_DURATION: u64 = 100;

/// Engine over a funded in-memory ledger with the default reserve.
pub fn test_engine() -> TestEngine {
    test_engine_with_reserve(RESERVE_FUNDS)
}

/// Engine with an explicit reserve balance (zero to exercise bonus
/// shortfall behavior).
pub fn test_engine_with_reserve(reserve: u64) -> TestEngine {
    let mut ledger = MemoryLedger::new();
    for account in [CREATOR, ALICE, BOB, CAROL] {
        ledger.fund(account, STARTING_BALANCE);
    }
    ledger.fund(RESERVE, reserve);
    PoolEngine::new(ledger, EngineAccounts::default(), OWNER.to_string())
}

/// Create a standard binary pool owned by [`CREATOR`].
pub fn create_test_pool(engine: &mut TestEngine) -> u64 {
    engine
        .create_pool(
            CREATOR,
            "Who wins the final?",
            "Best-of-five grand final between the two qualifiers",
            "Team A",
            "Team B",
            TEST_DURATION,
        )
        .expect("test pool creation must succeed")
}
