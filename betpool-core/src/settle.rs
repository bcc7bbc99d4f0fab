//! Settlement engine: the single point where a pool's outcome and net pool
//! become final.
//!
//! Manual, oracle and fallback resolution all funnel into
//! [`PoolEngine::apply_settlement`], so fee extraction and the settled flag
//! exist exactly once. The net pool is persisted in the settlement record and
//! never recomputed afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    bps_of,
    events::PoolEvent,
    ledger::Ledger,
    pool::{ResolutionTrigger, Settlement},
    PoolEngine, PoolError, Result, FEE_BPS,
};

/// Statistics returned by the enhanced settlement entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementStats {
    pub pool_id: u64,
    pub winning_outcome: usize,
    pub gross: u64,
    pub fee: u64,
    pub net_pool: u64,
    /// Bettors holding stake on the winning outcome.
    pub winner_count: u64,
    /// Total stake on the winning outcome.
    pub winning_total: u64,
}

/// Fee pot created when an oracle consensus settles a pool: half the
/// settlement fee is reserved for the participating providers, the rest
/// (plus any split remainder) for the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionFees {
    pub pool_id: u64,
    pub platform_share: u64,
    pub per_oracle: u64,
    pub participants: Vec<u64>,
    pub platform_collected: bool,
    pub claimed: BTreeSet<u64>,
}

impl ResolutionFees {
    pub(crate) fn split(pool_id: u64, fee: u64, participants: Vec<u64>) -> Self {
        let n = participants.len() as u64;
        let per_oracle = if n == 0 { 0 } else { (fee / 2) / n };
        Self {
            pool_id,
            platform_share: fee - per_oracle * n,
            per_oracle,
            participants,
            platform_collected: false,
            claimed: BTreeSet::new(),
        }
    }
}

impl<L: Ledger> PoolEngine<L> {
    /// Shared settlement transition consumed by every resolution path.
    ///
    /// Computes `fee = floor(gross * fee_bps / 10_000)`, moves the fee out of
    /// the pool (to the owner, or into the oracle fee pot for oracle
    /// triggers), and writes the one-way settlement record.
    pub(crate) fn apply_settlement(
        &mut self,
        pool_id: u64,
        winning_outcome: usize,
        trigger: ResolutionTrigger,
        fee_bps: u64,
    ) -> Result<()> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        pool.check_outcome(winning_outcome)?;
        let gross = pool.gross();
        let prior_payouts = pool.paid_out;
        let fee = bps_of(gross, fee_bps);

        match &trigger {
            ResolutionTrigger::Oracle { participants } => {
                // Fee stays in escrow; platform and providers claim their
                // shares from the pot afterwards.
                self.resolution_fees.insert(
                    pool_id,
                    ResolutionFees::split(pool_id, fee, participants.clone()),
                );
            }
            ResolutionTrigger::Manual | ResolutionTrigger::Fallback => {
                if fee > 0 {
                    let owner = self.access.owner().to_string();
                    self.escrow_out(&owner, fee)?;
                }
            }
        }

        let net_pool = gross - fee;
        let pool = self.pools.get_mut(&pool_id).expect("checked above");
        pool.settlement = Some(Settlement {
            winning_outcome,
            trigger: trigger.clone(),
            fee,
            net_pool,
            settled_at: now,
            prior_payouts,
            overturned: false,
        });

        if let Some(config) = self.configs.get_mut(&pool_id) {
            config.mark_resolved();
        }

        self.emit(PoolEvent::PoolSettled {
            pool_id,
            winning_outcome,
            trigger,
            fee,
            net_pool,
        });
        Ok(())
    }

    /// Manual settlement by the pool creator.
    pub fn settle_pool(&mut self, caller: &str, pool_id: u64, winning_outcome: usize) -> Result<()> {
        let pool = self.pool(pool_id)?;
        if pool.creator != caller {
            return Err(PoolError::Unauthorized(format!(
                "{caller} is not the creator of pool {pool_id}"
            )));
        }
        self.apply_settlement(pool_id, winning_outcome, ResolutionTrigger::Manual, FEE_BPS)
    }

    /// Settlement by the creator or an admin, returning settlement stats.
    pub fn settle_pool_enhanced(
        &mut self,
        caller: &str,
        pool_id: u64,
        winning_outcome: usize,
    ) -> Result<SettlementStats> {
        let pool = self.pool(pool_id)?;
        if pool.creator != caller && !self.access.is_admin(caller) {
            return Err(PoolError::Unauthorized(format!(
                "{caller} is neither creator nor admin for pool {pool_id}"
            )));
        }
        self.apply_settlement(pool_id, winning_outcome, ResolutionTrigger::Manual, FEE_BPS)?;

        let pool = self.pool(pool_id)?;
        let settlement = pool.settlement()?;
        let winner_count = self
            .bets
            .iter()
            .filter(|((id, _), bet)| *id == pool_id && bet.amounts[winning_outcome] > 0)
            .count() as u64;
        Ok(SettlementStats {
            pool_id,
            winning_outcome,
            gross: pool.gross(),
            fee: settlement.fee,
            net_pool: settlement.net_pool,
            winner_count,
            winning_total: pool.totals[winning_outcome],
        })
    }

    /// Direct settlement by an active oracle provider attesting the outcome.
    ///
    /// The caller must own an active registered provider. Settles through the
    /// oracle trigger, so the fee stays escrowed as a fee pot with the caller's
    /// provider as sole participant.
    pub fn settle_pool_oracle(
        &mut self,
        caller: &str,
        pool_id: u64,
        winning_outcome: usize,
    ) -> Result<()> {
        let provider_id = self
            .providers
            .values()
            .find(|p| p.principal == caller && p.active)
            .map(|p| p.id)
            .ok_or_else(|| {
                PoolError::Unauthorized(format!(
                    "{caller} is not an active oracle provider"
                ))
            })?;
        self.apply_settlement(
            pool_id,
            winning_outcome,
            ResolutionTrigger::Oracle {
                participants: vec![provider_id],
            },
            FEE_BPS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn fee_is_exact_and_net_pool_is_persisted() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 600_000).unwrap();
        engine.place_bet(BOB, id, 1, 400_000).unwrap();

        engine.settle_pool(CREATOR, id, 0).unwrap();

        let settlement = engine.get_pool(id).unwrap().settlement().unwrap().clone();
        assert_eq!(settlement.fee, 20_000); // floor(1_000_000 * 2%)
        assert_eq!(settlement.net_pool, 980_000);
        assert_eq!(settlement.winning_outcome, 0);
        assert_eq!(settlement.trigger, ResolutionTrigger::Manual);
        // fee landed with the owner, the rest stays escrowed
        assert_eq!(engine.ledger().balance(OWNER), 20_000);
        assert_eq!(engine.ledger().balance(ESCROW), 980_000);
    }

    #[test]
    fn settlement_is_idempotent_failure_after_first() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 10_000).unwrap();
        engine.settle_pool(CREATOR, id, 0).unwrap();

        // second settle always fails, regardless of outcome argument
        assert_eq!(
            engine.settle_pool(CREATOR, id, 0),
            Err(PoolError::PoolSettled(id))
        );
        assert_eq!(
            engine.settle_pool(CREATOR, id, 1),
            Err(PoolError::PoolSettled(id))
        );
        // owner got the fee exactly once
        assert_eq!(engine.ledger().balance(OWNER), bps_of(10_000, FEE_BPS));
    }

    #[test]
    fn only_creator_settles_plain_path() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 10_000).unwrap();

        assert_eq!(engine.settle_pool(ALICE, id, 0).unwrap_err().code(), 200);
        assert_eq!(engine.settle_pool(OWNER, id, 0).unwrap_err().code(), 200);
        engine.settle_pool(CREATOR, id, 0).unwrap();
    }

    #[test]
    fn enhanced_path_admits_admins_and_reports_stats() {
        let mut engine = test_engine();
        engine.add_admin(OWNER, "ops").unwrap();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 100_000).unwrap();
        engine.place_bet(BOB, id, 0, 300_000).unwrap();
        engine.place_bet(CAROL, id, 1, 600_000).unwrap();

        assert_eq!(
            engine
                .settle_pool_enhanced("rando", id, 0)
                .unwrap_err()
                .code(),
            200
        );
        let stats = engine.settle_pool_enhanced("ops", id, 0).unwrap();
        assert_eq!(stats.gross, 1_000_000);
        assert_eq!(stats.fee, 20_000);
        assert_eq!(stats.net_pool, 980_000);
        assert_eq!(stats.winner_count, 2);
        assert_eq!(stats.winning_total, 400_000);
    }

    #[test]
    fn invalid_outcome_rejected_before_any_transfer() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 10_000).unwrap();
        assert_eq!(
            engine.settle_pool(CREATOR, id, 2),
            Err(PoolError::InvalidOutcome)
        );
        assert!(!engine.get_pool(id).unwrap().settled());
        assert_eq!(engine.ledger().balance(OWNER), 0);
    }

    #[test]
    fn oracle_attested_settlement_requires_active_provider() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 600_000).unwrap();
        engine.place_bet(BOB, id, 1, 400_000).unwrap();
        let p1 = engine
            .register_oracle_provider(ORACLE_1, vec!["score".to_string()])
            .unwrap();

        assert_eq!(
            engine.settle_pool_oracle("stranger", id, 0).unwrap_err().code(),
            200
        );
        engine.set_provider_active(OWNER, p1, false).unwrap();
        assert_eq!(
            engine.settle_pool_oracle(ORACLE_1, id, 0).unwrap_err().code(),
            200
        );
        engine.set_provider_active(OWNER, p1, true).unwrap();

        engine.settle_pool_oracle(ORACLE_1, id, 0).unwrap();
        let settlement = engine.get_pool(id).unwrap().settlement().unwrap().clone();
        assert_eq!(settlement.fee, 20_000);
        assert_eq!(settlement.net_pool, 980_000);
        assert_eq!(
            settlement.trigger,
            ResolutionTrigger::Oracle {
                participants: vec![p1]
            }
        );
        // fee stays escrowed as a pot with the attesting provider as sole
        // participant
        assert_eq!(engine.ledger().balance(OWNER), 0);
        assert_eq!(engine.ledger().balance(ESCROW), 1_000_000);
        assert_eq!(engine.claim_oracle_fee(ORACLE_1, id).unwrap(), 10_000);
        assert_eq!(engine.collect_resolution_fee(OWNER, id).unwrap(), 10_000);

        assert_eq!(
            engine.settle_pool_oracle(ORACLE_1, id, 1),
            Err(PoolError::PoolSettled(id))
        );
    }

    #[test]
    fn oracle_fee_split_accounts_for_remainders() {
        let fees = ResolutionFees::split(0, 20_001, vec![1, 2, 3]);
        // oracle pot = 10_000, per oracle = 3_333, platform keeps the rest
        assert_eq!(fees.per_oracle, 3_333);
        assert_eq!(fees.platform_share, 20_001 - 3 * 3_333);
        assert_eq!(
            fees.platform_share + fees.per_oracle * 3,
            20_001,
            "split must conserve the fee"
        );

        let solo = ResolutionFees::split(0, 100, vec![]);
        assert_eq!(solo.platform_share, 100);
        assert_eq!(solo.per_oracle, 0);
    }
}
