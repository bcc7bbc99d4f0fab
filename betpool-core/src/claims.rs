//! Claims & withdrawals: the paths funds leave escrow through.
//!
//! A single claim record per (pool, user) guards both claim-winnings and
//! request-refund, so the two paths are mutually exclusive and each pays at
//! most once. Bonuses come from the platform's incentive reserve, never from
//! the pool itself; a short reserve skips the bonus instead of failing the
//! claim.

use serde::{Deserialize, Serialize};

use crate::{
    bps_of, events::PoolEvent, ledger::Ledger, pro_rata, AccountId, PoolEngine, PoolError, Result,
    EARLY_BIRD_BONUS_BPS, EARLY_BIRD_WINDOW, REFERRAL_BONUS_BPS, VOLUME_BONUS_BPS,
    VOLUME_BONUS_THRESHOLD,
};

/// Status of an admin-gated withdrawal request. Terminal once decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admin-gated withdrawal of part of a user's stake, kept for audit even
/// after rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: u64,
    pub pool_id: u64,
    pub user: AccountId,
    pub amount: u64,
    pub status: WithdrawalStatus,
    pub requested_at: u64,
}

/// Breakdown of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayout {
    /// Pro-rata share of the net pool.
    pub base: u64,
    /// Early-bird bonus paid from the reserve (0 if not eligible or the
    /// reserve was short).
    pub early_bird_bonus: u64,
    /// Volume bonus paid from the reserve.
    pub volume_bonus: u64,
    /// Referral bonus paid to the claimer's referrer, not the claimer.
    pub referral_bonus: u64,
}

impl ClaimPayout {
    /// Amount credited to the claimer. The referral bonus is excluded since
    /// it goes to the referrer.
    pub fn total(&self) -> u64 {
        self.base + self.early_bird_bonus + self.volume_bonus
    }
}

impl<L: Ledger> PoolEngine<L> {
    /// Claim the caller's share of a settled pool's net pool, at most once.
    pub fn claim_winnings(&mut self, caller: &str, pool_id: u64) -> Result<ClaimPayout> {
        let pool = self.pool(pool_id)?;
        let settlement = pool.settlement()?;
        if settlement.overturned {
            return Err(PoolError::SettlementOverturned(pool_id));
        }
        let winning_outcome = settlement.winning_outcome;
        let net_pool = settlement.net_pool;
        let winning_total = pool.totals[winning_outcome];
        let created_at = pool.created_at;

        let key = (pool_id, caller.to_string());
        if self.claimed.contains(&key) {
            return Err(PoolError::AlreadyClaimed(pool_id));
        }
        let bet = self
            .bets
            .get(&key)
            .ok_or(PoolError::NoWinnings(pool_id))?;
        let user_stake = bet.effective_stake(winning_outcome);
        if user_stake == 0 {
            return Err(PoolError::NoWinnings(pool_id));
        }
        let first_bet_height = bet.first_bet_height;
        let total_staked = bet.total;

        let base = pro_rata(user_stake, winning_total, net_pool);

        // Base payout and the claim record commit together; the transfer is
        // the last fallible step before the flag is set.
        self.escrow_out(caller, base)?;
        self.claimed.insert(key);
        let pool = self.pools.get_mut(&pool_id).expect("checked above");
        pool.paid_out += base;

        // Bonuses ride on top, from the reserve. Shortfalls skip the bonus.
        let mut early_bird_bonus = 0;
        let mut volume_bonus = 0;
        if first_bet_height.saturating_sub(created_at) <= EARLY_BIRD_WINDOW {
            early_bird_bonus = bps_of(base, EARLY_BIRD_BONUS_BPS);
        }
        if total_staked >= VOLUME_BONUS_THRESHOLD {
            volume_bonus = bps_of(base, VOLUME_BONUS_BPS);
        }
        let claimer_bonus = early_bird_bonus + volume_bonus;
        let reserve = self.accounts.reserve.clone();
        if claimer_bonus > 0
            && self
                .ledger
                .transfer(&reserve, caller, claimer_bonus)
                .is_err()
        {
            early_bird_bonus = 0;
            volume_bonus = 0;
        }

        let mut referral_bonus = 0;
        if let Some(referrer) = self.referrers.get(caller).cloned() {
            let bonus = bps_of(base, REFERRAL_BONUS_BPS);
            if bonus > 0 && self.ledger.transfer(&reserve, &referrer, bonus).is_ok() {
                referral_bonus = bonus;
            }
        }

        self.emit(PoolEvent::WinningsClaimed {
            pool_id,
            user: caller.to_string(),
            base,
            bonus: early_bird_bonus + volume_bonus,
        });
        Ok(ClaimPayout {
            base,
            early_bird_bonus,
            volume_bonus,
            referral_bonus,
        })
    }

    /// Refund the caller's remaining stake from an expired, unsettled pool
    /// (or an overturned one), at most once, sharing the claim record with
    /// `claim_winnings`.
    ///
    /// Overturned pools refund pro rata against the escrow still held for
    /// the pool: the fee (and any pre-overturn claims) already left, so full
    /// stakes cannot be promised to everyone.
    pub fn request_refund(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        let overturned_escrow = match &pool.settlement {
            Some(settlement) if !settlement.overturned => {
                return Err(PoolError::PoolSettled(pool_id));
            }
            // overturned settlements re-open the refund path immediately
            Some(settlement) => Some(
                pool.gross()
                    .saturating_sub(settlement.fee)
                    .saturating_sub(pool.paid_out),
            ),
            None => {
                if !pool.expired(now) {
                    return Err(PoolError::PoolNotExpired(pool_id));
                }
                None
            }
        };

        let key = (pool_id, caller.to_string());
        if self.claimed.contains(&key) {
            return Err(PoolError::AlreadyClaimed(pool_id));
        }
        let bet = self.bets.get(&key).ok_or(PoolError::BetNotFound(pool_id))?;
        let stake = bet.remaining();
        if stake == 0 {
            return Err(PoolError::BetNotFound(pool_id));
        }
        let amount = match overturned_escrow {
            Some(remaining_escrow) => {
                let outstanding: u64 = self
                    .bets
                    .iter()
                    .filter(|(k, _)| k.0 == pool_id && !self.claimed.contains(*k))
                    .map(|(_, b)| b.remaining())
                    .sum();
                pro_rata(stake, outstanding, remaining_escrow)
            }
            None => stake,
        };

        self.escrow_out(caller, amount)?;
        self.claimed.insert(key);
        let pool = self.pools.get_mut(&pool_id).expect("checked above");
        pool.paid_out += amount;

        self.emit(PoolEvent::RefundIssued {
            pool_id,
            user: caller.to_string(),
            amount,
        });
        Ok(amount)
    }

    // --- Admin-gated withdrawal requests -----------------------------------

    /// Create a pending withdrawal, bounded by the caller's remaining stake.
    /// Settled pools refuse: escrowed stake belongs to the winners by then.
    pub fn request_withdrawal(&mut self, caller: &str, pool_id: u64, amount: u64) -> Result<u64> {
        let now = self.ledger.block_height();
        if self.pool(pool_id)?.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        if amount == 0 {
            return Err(PoolError::InvalidAmount(amount));
        }
        let key = (pool_id, caller.to_string());
        if self.claimed.contains(&key) {
            return Err(PoolError::AlreadyClaimed(pool_id));
        }
        let bet = self.bets.get(&key).ok_or(PoolError::BetNotFound(pool_id))?;
        let staked = bet.remaining();
        if amount > staked {
            return Err(PoolError::WithdrawalExceedsStake {
                requested: amount,
                staked,
            });
        }

        let id = self.next_withdrawal_id;
        self.withdrawals.insert(
            id,
            WithdrawalRequest {
                id,
                pool_id,
                user: caller.to_string(),
                amount,
                status: WithdrawalStatus::Pending,
                requested_at: now,
            },
        );
        self.next_withdrawal_id += 1;
        self.emit(PoolEvent::WithdrawalRequested {
            withdrawal_id: id,
            pool_id,
            user: caller.to_string(),
            amount,
        });
        Ok(id)
    }

    /// Admin approval: transfers the amount and decrements the stake.
    ///
    /// The amount is re-checked against the remaining stake at approval
    /// time; intervening claims or approvals may have shrunk it.
    pub fn approve_withdrawal(&mut self, caller: &str, withdrawal_id: u64) -> Result<()> {
        self.access.require_admin(caller)?;
        let request = self
            .withdrawals
            .get(&withdrawal_id)
            .ok_or(PoolError::WithdrawalNotFound(withdrawal_id))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(PoolError::WithdrawalConcluded(withdrawal_id));
        }
        let pool_id = request.pool_id;
        let user = request.user.clone();
        let amount = request.amount;

        // a request that was pending when the pool settled is dead: the
        // escrow behind it now backs the winners' claims
        if self.pool(pool_id)?.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }

        let key = (pool_id, user.clone());
        if self.claimed.contains(&key) {
            return Err(PoolError::AlreadyClaimed(pool_id));
        }
        let bet = self.bets.get(&key).ok_or(PoolError::BetNotFound(pool_id))?;
        let staked = bet.remaining();
        if amount > staked {
            return Err(PoolError::WithdrawalExceedsStake {
                requested: amount,
                staked,
            });
        }

        self.escrow_out(&user, amount)?;
        self.bets.get_mut(&key).expect("checked above").withdrawn += amount;
        self.pools
            .get_mut(&pool_id)
            .expect("checked above")
            .paid_out += amount;
        self.withdrawals
            .get_mut(&withdrawal_id)
            .expect("checked above")
            .status = WithdrawalStatus::Approved;
        self.emit(PoolEvent::WithdrawalApproved { withdrawal_id });
        Ok(())
    }

    /// Admin rejection: no transfer, record retained for audit.
    pub fn reject_withdrawal(&mut self, caller: &str, withdrawal_id: u64) -> Result<()> {
        self.access.require_admin(caller)?;
        let request = self
            .withdrawals
            .get_mut(&withdrawal_id)
            .ok_or(PoolError::WithdrawalNotFound(withdrawal_id))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(PoolError::WithdrawalConcluded(withdrawal_id));
        }
        request.status = WithdrawalStatus::Rejected;
        self.emit(PoolEvent::WithdrawalRejected { withdrawal_id });
        Ok(())
    }

    /// Approve a batch; stops at the first failure and reports it.
    pub fn batch_approve_withdrawals(&mut self, caller: &str, withdrawal_ids: &[u64]) -> Result<()> {
        for &id in withdrawal_ids {
            self.approve_withdrawal(caller, id)?;
        }
        Ok(())
    }

    /// Remaining stake the user could still withdraw or be refunded.
    pub fn can_withdraw(&self, user: &str, pool_id: u64) -> u64 {
        let key = (pool_id, user.to_string());
        if self.claimed.contains(&key) {
            return 0;
        }
        self.bets.get(&key).map(|bet| bet.remaining()).unwrap_or(0)
    }

    pub fn get_pending_withdrawal(&self, withdrawal_id: u64) -> Option<&WithdrawalRequest> {
        self.withdrawals.get(&withdrawal_id)
    }

    // --- Emergency withdrawal ----------------------------------------------

    /// Creator-only sweep of a settled, expired pool's remaining escrow.
    ///
    /// Moves `net_pool` minus post-settlement payouts, the funds actually
    /// still escrowed for this pool. Sweeping the pre-fee gross total would
    /// exceed escrow once the fee is out or any winner has claimed.
    pub fn emergency_withdrawal(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.creator != caller {
            return Err(PoolError::Unauthorized(format!(
                "{caller} is not the creator of pool {pool_id}"
            )));
        }
        let settlement = pool.settlement()?;
        if settlement.overturned {
            // the remaining escrow backs the re-opened refunds instead
            return Err(PoolError::SettlementOverturned(pool_id));
        }
        if !pool.expired(now) {
            return Err(PoolError::PoolNotExpired(pool_id));
        }
        let paid_since_settlement = pool.paid_out - settlement.prior_payouts;
        let amount = settlement.net_pool.saturating_sub(paid_since_settlement);

        self.escrow_out(caller, amount)?;
        let pool = self.pools.get_mut(&pool_id).expect("checked above");
        pool.paid_out += amount;
        self.emit(PoolEvent::EmergencyWithdrawal {
            pool_id,
            creator: caller.to_string(),
            amount,
        });
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::{DISPUTE_VOTING_PERIOD, MIN_BET_AMOUNT};

    fn two_sided_pool(engine: &mut TestEngine) -> u64 {
        let id = create_test_pool(engine);
        engine.place_bet(ALICE, id, 0, 1_000_000).unwrap();
        engine.place_bet(BOB, id, 1, 1_000_000).unwrap();
        id
    }

    #[test]
    fn end_to_end_settle_and_claim_arithmetic() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();

        // 2_000_000 gross -> 40_000 fee to the owner
        assert_eq!(engine.ledger().balance(OWNER), 40_000);

        let payout = engine.claim_winnings(ALICE, id).unwrap();
        assert_eq!(payout.base, 1_960_000);
        // sole bet landed at pool creation height: early-bird applies,
        // 2_000_000 total stake: volume bonus applies
        assert_eq!(payout.early_bird_bonus, 98_000);
        assert_eq!(payout.volume_bonus, 39_200);

        assert_eq!(
            engine.claim_winnings(BOB, id),
            Err(PoolError::NoWinnings(id))
        );
    }

    #[test]
    fn payouts_are_proportional_after_fee() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        // amounts scaled up from the 100/100 example to clear MIN_BET_AMOUNT
        engine.place_bet(ALICE, id, 0, 100_000).unwrap();
        engine.place_bet(CAROL, id, 0, 100_000).unwrap();
        engine.place_bet(BOB, id, 1, MIN_BET_AMOUNT).unwrap();
        engine.settle_pool(CREATOR, id, 0).unwrap();

        let net = engine.get_pool(id).unwrap().settlement().unwrap().net_pool;
        let a = engine.claim_winnings(ALICE, id).unwrap();
        let c = engine.claim_winnings(CAROL, id).unwrap();
        assert_eq!(a.base, net / 2);
        assert_eq!(c.base, net / 2);
    }

    #[test]
    fn claim_is_at_most_once() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();

        engine.claim_winnings(ALICE, id).unwrap();
        assert_eq!(
            engine.claim_winnings(ALICE, id),
            Err(PoolError::AlreadyClaimed(id))
        );
        // the refund path shares the claim record
        engine.ledger_mut().advance(TEST_DURATION + 1);
        assert_eq!(
            engine.request_refund(ALICE, id).unwrap_err().code(),
            300 // settled pools refuse refunds outright
        );
    }

    #[test]
    fn claim_requires_settlement() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        assert_eq!(
            engine.claim_winnings(ALICE, id),
            Err(PoolError::NotSettled(id))
        );
        assert_eq!(
            engine.claim_winnings(ALICE, 404),
            Err(PoolError::PoolNotFound(404))
        );
    }

    #[test]
    fn late_bettor_gets_no_early_bird_bonus() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 200_000).unwrap();
        engine.ledger_mut().advance(EARLY_BIRD_WINDOW + 1);
        engine.place_bet(CAROL, id, 0, 200_000).unwrap();
        engine.place_bet(BOB, id, 1, 100_000).unwrap();
        engine.settle_pool(CREATOR, id, 0).unwrap();

        let alice = engine.claim_winnings(ALICE, id).unwrap();
        let carol = engine.claim_winnings(CAROL, id).unwrap();
        assert!(alice.early_bird_bonus > 0);
        assert_eq!(carol.early_bird_bonus, 0);
    }

    #[test]
    fn bonus_skipped_when_reserve_is_short() {
        let mut engine = test_engine_with_reserve(0);
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();

        let payout = engine.claim_winnings(ALICE, id).unwrap();
        assert_eq!(payout.base, 1_960_000);
        assert_eq!(payout.early_bird_bonus, 0);
        assert_eq!(payout.volume_bonus, 0);
    }

    #[test]
    fn referral_bonus_goes_to_referrer() {
        let mut engine = test_engine();
        engine.register_referral(ALICE, CAROL).unwrap();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();

        let carol_before = engine.ledger().balance(CAROL);
        let payout = engine.claim_winnings(ALICE, id).unwrap();
        assert_eq!(payout.referral_bonus, bps_of(1_960_000, REFERRAL_BONUS_BPS));
        assert_eq!(
            engine.ledger().balance(CAROL),
            carol_before + payout.referral_bonus
        );
    }

    #[test]
    fn refund_gated_on_expiry_and_settlement() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 50_000).unwrap();

        assert_eq!(
            engine.request_refund(ALICE, id),
            Err(PoolError::PoolNotExpired(id))
        );

        engine.ledger_mut().advance(TEST_DURATION + 1);
        let alice_before = engine.ledger().balance(ALICE);
        assert_eq!(engine.request_refund(ALICE, id).unwrap(), 50_000);
        assert_eq!(engine.ledger().balance(ALICE), alice_before + 50_000);
        assert_eq!(
            engine.request_refund(ALICE, id),
            Err(PoolError::AlreadyClaimed(id))
        );
        assert_eq!(
            engine.request_refund(BOB, id),
            Err(PoolError::BetNotFound(id))
        );
    }

    #[test]
    fn refund_refused_once_settled() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();
        engine.ledger_mut().advance(TEST_DURATION + 1);
        assert_eq!(
            engine.request_refund(BOB, id),
            Err(PoolError::PoolSettled(id))
        );
    }

    fn overturn(engine: &mut TestEngine, pool_id: u64) {
        let dispute_id = engine.challenge_settlement(BOB, pool_id).unwrap();
        engine.vote_on_dispute(ALICE, dispute_id, true).unwrap();
        engine.vote_on_dispute(CAROL, dispute_id, true).unwrap();
        engine.ledger_mut().advance(DISPUTE_VOTING_PERIOD + 1);
        engine.resolve_dispute(dispute_id).unwrap();
    }

    #[test]
    fn overturned_settlement_freezes_claims_and_reopens_refunds() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();
        overturn(&mut engine, id);

        assert_eq!(
            engine.claim_winnings(ALICE, id),
            Err(PoolError::SettlementOverturned(id))
        );
        // refund path opens even though the pool is formally settled; the
        // 40_000 fee already left escrow, so the 1_960_000 remainder is
        // shared pro rata over the 2_000_000 of outstanding stakes
        assert_eq!(engine.request_refund(BOB, id).unwrap(), 980_000);
        assert_eq!(engine.request_refund(ALICE, id).unwrap(), 980_000);
        assert_eq!(engine.get_pool_stats(id).unwrap().remaining_escrow, 0);
    }

    #[test]
    fn overturned_refunds_never_overdraw_escrow() {
        // a winner claim before the overturn consumed the whole net pool
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();
        engine.claim_winnings(ALICE, id).unwrap();
        overturn(&mut engine, id);

        // nothing is left for Bob, but the refund settles at the fair share
        // of the remaining escrow instead of failing on the transfer
        assert_eq!(engine.request_refund(BOB, id).unwrap(), 0);
    }

    #[test]
    fn overturned_pool_refuses_emergency_sweep() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        engine.settle_pool(CREATOR, id, 0).unwrap();
        overturn(&mut engine, id);
        engine.ledger_mut().advance(TEST_DURATION + 1);
        assert_eq!(
            engine.emergency_withdrawal(CREATOR, id),
            Err(PoolError::SettlementOverturned(id))
        );
        // the escrow stays behind the re-opened refunds
        assert_eq!(engine.request_refund(ALICE, id).unwrap(), 980_000);
    }

    #[test]
    fn withdrawal_lifecycle_and_bounds() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 100_000).unwrap();

        assert_eq!(
            engine.request_withdrawal(ALICE, id, 100_001),
            Err(PoolError::WithdrawalExceedsStake {
                requested: 100_001,
                staked: 100_000
            })
        );

        let wid = engine.request_withdrawal(ALICE, id, 40_000).unwrap();
        assert_eq!(
            engine.get_pending_withdrawal(wid).unwrap().status,
            WithdrawalStatus::Pending
        );

        // only admins decide
        assert_eq!(
            engine.approve_withdrawal(ALICE, wid).unwrap_err().code(),
            200
        );

        let alice_before = engine.ledger().balance(ALICE);
        engine.approve_withdrawal(OWNER, wid).unwrap();
        assert_eq!(engine.ledger().balance(ALICE), alice_before + 40_000);
        assert_eq!(engine.can_withdraw(ALICE, id), 60_000);
        // terminal
        assert_eq!(
            engine.approve_withdrawal(OWNER, wid),
            Err(PoolError::WithdrawalConcluded(wid))
        );

        let wid2 = engine.request_withdrawal(ALICE, id, 10_000).unwrap();
        engine.reject_withdrawal(OWNER, wid2).unwrap();
        assert_eq!(
            engine.get_pending_withdrawal(wid2).unwrap().status,
            WithdrawalStatus::Rejected
        );
        // rejected record kept for audit, no transfer happened
        assert_eq!(engine.can_withdraw(ALICE, id), 60_000);
    }

    #[test]
    fn withdrawals_close_at_settlement() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        // Bob parks a request while the pool is still open
        let pending = engine.request_withdrawal(BOB, id, 1_000_000).unwrap();
        engine.settle_pool(CREATOR, id, 0).unwrap();

        // the loser can neither file a new request nor get the old one
        // approved; his stake backs the winners' net pool now
        assert_eq!(
            engine.request_withdrawal(BOB, id, 1_000_000),
            Err(PoolError::PoolSettled(id))
        );
        assert_eq!(
            engine.approve_withdrawal(OWNER, pending),
            Err(PoolError::PoolSettled(id))
        );

        // the winner's full claim still clears
        let payout = engine.claim_winnings(ALICE, id).unwrap();
        assert_eq!(payout.base, 1_960_000);
        assert_eq!(engine.get_pool_stats(id).unwrap().remaining_escrow, 0);
    }

    #[test]
    fn batch_approval_stops_at_first_failure() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 100_000).unwrap();
        engine.place_bet(BOB, id, 1, 100_000).unwrap();

        let w1 = engine.request_withdrawal(ALICE, id, 10_000).unwrap();
        let w2 = engine.request_withdrawal(BOB, id, 10_000).unwrap();
        engine.reject_withdrawal(OWNER, w1).unwrap();

        assert_eq!(
            engine.batch_approve_withdrawals(OWNER, &[w1, w2]),
            Err(PoolError::WithdrawalConcluded(w1))
        );
        // w2 untouched by the aborted batch
        assert_eq!(
            engine.get_pending_withdrawal(w2).unwrap().status,
            WithdrawalStatus::Pending
        );
        engine.batch_approve_withdrawals(OWNER, &[w2]).unwrap();
    }

    #[test]
    fn emergency_withdrawal_moves_net_minus_payouts() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 1_000_000).unwrap();
        engine.place_bet(CAROL, id, 0, 1_000_000).unwrap();
        engine.place_bet(BOB, id, 1, 2_000_000).unwrap();
        engine.settle_pool(CREATOR, id, 0).unwrap();
        engine.claim_winnings(ALICE, id).unwrap();
        engine.ledger_mut().advance(TEST_DURATION + 1);

        // the pre-fee gross (4_000_000) exceeds what escrow still holds for
        // this pool; the corrected arithmetic moves exactly the remainder
        let gross = engine.get_pool(id).unwrap().gross();
        let escrowed_for_pool = engine.get_pool_stats(id).unwrap().remaining_escrow;
        assert_eq!(escrowed_for_pool, 1_960_000); // net 3_920_000 minus Alice's claim
        assert!(gross > escrowed_for_pool);

        assert_eq!(
            engine.emergency_withdrawal(BOB, id).unwrap_err().code(),
            200
        );
        let swept = engine.emergency_withdrawal(CREATOR, id).unwrap();
        assert_eq!(swept, escrowed_for_pool);
        assert_eq!(engine.get_pool_stats(id).unwrap().remaining_escrow, 0);
    }

    #[test]
    fn emergency_withdrawal_requires_settled_and_expired() {
        let mut engine = test_engine();
        let id = two_sided_pool(&mut engine);
        assert_eq!(
            engine.emergency_withdrawal(CREATOR, id),
            Err(PoolError::NotSettled(id))
        );
        engine.settle_pool(CREATOR, id, 0).unwrap();
        assert_eq!(
            engine.emergency_withdrawal(CREATOR, id),
            Err(PoolError::PoolNotExpired(id))
        );
    }

    #[test]
    fn conservation_holds_through_claims() {
        let mut engine = test_engine();
        let id = create_test_pool(&mut engine);
        engine.place_bet(ALICE, id, 0, 300_000).unwrap();
        engine.place_bet(CAROL, id, 0, 500_000).unwrap();
        engine.place_bet(BOB, id, 1, 200_000).unwrap();
        let gross = engine.get_pool(id).unwrap().gross();
        engine.settle_pool(CREATOR, id, 0).unwrap();

        for user in [ALICE, CAROL] {
            engine.claim_winnings(user, id).unwrap();
            let stats = engine.get_pool_stats(id).unwrap();
            let settlement = engine.get_pool(id).unwrap().settlement().unwrap();
            assert_eq!(
                settlement.fee + stats.paid_out + stats.remaining_escrow,
                gross,
                "fee + payouts + remaining escrow must equal the gross pool"
            );
        }
    }
}
