//! Dispute subsystem: post-settlement challenges resolved by community vote.
//!
//! A dispute may only be opened inside the dispute window after settlement
//! and requires a bond proportional to the pool. Votes accumulate until the
//! deadline; resolution strictly after it. An upheld dispute refunds the bond
//! and flags the settlement overturned, which freezes claims and re-opens the
//! refund path.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    bps_of, events::PoolEvent, ledger::Ledger, AccountId, PoolEngine, PoolError, Result,
    DISPUTE_BOND_BPS, DISPUTE_VOTING_PERIOD, DISPUTE_WINDOW, MAX_DESCRIPTION_LEN,
};

/// Terminal state of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeResolution {
    /// Voting still open or not yet resolved.
    None,
    /// Majority sided with the disputer; settlement overturned, bond
    /// refunded.
    Upheld,
    /// Majority sided against; settlement stands, bond forfeited.
    Rejected,
}

/// A settlement challenge. Never deleted; `resolution` is the terminal flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: u64,
    pub pool_id: u64,
    pub disputer: AccountId,
    pub reason: String,
    /// Optional sha256 hex digest of off-chain evidence.
    pub evidence_hash: Option<String>,
    pub bond: u64,
    pub votes_for: u64,
    pub votes_against: u64,
    pub voters: BTreeSet<AccountId>,
    pub voting_deadline: u64,
    pub resolution: DisputeResolution,
}

impl<L: Ledger> PoolEngine<L> {
    /// Open a dispute against a settled pool, escrowing the bond.
    pub fn create_dispute(
        &mut self,
        caller: &str,
        pool_id: u64,
        reason: &str,
        evidence_hash: Option<String>,
    ) -> Result<u64> {
        if reason.is_empty() || reason.len() > MAX_DESCRIPTION_LEN {
            return Err(PoolError::InvalidDescription);
        }
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        let settlement = pool.settlement()?;
        if now.saturating_sub(settlement.settled_at) > DISPUTE_WINDOW {
            return Err(PoolError::DisputePeriodExpired(pool_id));
        }
        let bond = bps_of(pool.gross(), DISPUTE_BOND_BPS);

        self.escrow_in(caller, bond)?;

        let id = self.next_dispute_id;
        let voting_deadline = now + DISPUTE_VOTING_PERIOD;
        self.disputes.insert(
            id,
            Dispute {
                id,
                pool_id,
                disputer: caller.to_string(),
                reason: reason.to_string(),
                evidence_hash,
                bond,
                votes_for: 0,
                votes_against: 0,
                voters: BTreeSet::new(),
                voting_deadline,
                resolution: DisputeResolution::None,
            },
        );
        self.next_dispute_id += 1;
        self.emit(PoolEvent::DisputeCreated {
            dispute_id: id,
            pool_id,
            disputer: caller.to_string(),
            bond,
            voting_deadline,
        });
        Ok(id)
    }

    /// Convenience wrapper that opens a dispute with a canned reason.
    pub fn challenge_settlement(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        self.create_dispute(caller, pool_id, "settlement outcome challenged", None)
    }

    /// Cast one vote per principal per dispute, while voting is open.
    pub fn vote_on_dispute(&mut self, caller: &str, dispute_id: u64, in_favor: bool) -> Result<()> {
        let now = self.ledger.block_height();
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(PoolError::DisputeNotFound(dispute_id))?;
        if dispute.resolution != DisputeResolution::None {
            return Err(PoolError::DisputeConcluded(dispute_id));
        }
        if now > dispute.voting_deadline {
            return Err(PoolError::DisputePeriodExpired(dispute.pool_id));
        }
        if !dispute.voters.insert(caller.to_string()) {
            return Err(PoolError::AlreadyVoted(dispute_id));
        }
        if in_favor {
            dispute.votes_for += 1;
        } else {
            dispute.votes_against += 1;
        }
        self.emit(PoolEvent::DisputeVoteCast {
            dispute_id,
            voter: caller.to_string(),
            in_favor,
        });
        Ok(())
    }

    /// Resolve a dispute after its voting deadline. Strict majority in favor
    /// upholds it: bond refunded, settlement flagged overturned. Anything
    /// else rejects it and forfeits the bond to the contract.
    pub fn resolve_dispute(&mut self, dispute_id: u64) -> Result<DisputeResolution> {
        let now = self.ledger.block_height();
        let dispute = self
            .disputes
            .get(&dispute_id)
            .ok_or(PoolError::DisputeNotFound(dispute_id))?;
        if dispute.resolution != DisputeResolution::None {
            return Err(PoolError::DisputeConcluded(dispute_id));
        }
        if now <= dispute.voting_deadline {
            return Err(PoolError::VotingNotConcluded(dispute_id));
        }
        let upheld = dispute.votes_for > dispute.votes_against;
        let pool_id = dispute.pool_id;
        let disputer = dispute.disputer.clone();
        let bond = dispute.bond;

        if upheld {
            self.escrow_out(&disputer, bond)?;
            let pool = self.pool_mut(pool_id)?;
            if let Some(settlement) = pool.settlement.as_mut() {
                settlement.overturned = true;
            }
        }
        // rejected: the bond simply stays in escrow, forfeited

        let resolution = if upheld {
            DisputeResolution::Upheld
        } else {
            DisputeResolution::Rejected
        };
        self.disputes
            .get_mut(&dispute_id)
            .expect("checked above")
            .resolution = resolution;
        self.emit(PoolEvent::DisputeResolved { dispute_id, upheld });
        Ok(resolution)
    }

    pub fn get_dispute(&self, dispute_id: u64) -> Option<&Dispute> {
        self.disputes.get(&dispute_id)
    }
}
