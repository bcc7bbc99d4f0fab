//! Oracle subsystem: provider registry, data submission, weighted-consensus
//! aggregation and the automated-resolution state machine.
//!
//! Per pool the configuration moves through
//! `configured -> resolution-attempted -> {resolved | fallback-pending} ->
//! resolved`. An indecisive attempt is a non-fatal outcome, not an error: it
//! burns one retry and leaves the pool untouched.

use serde::{Deserialize, Serialize};

use crate::{
    events::PoolEvent,
    ledger::Ledger,
    pool::ResolutionTrigger,
    AccountId, PoolEngine, PoolError, Result, DEFAULT_PROVIDER_RELIABILITY, FALLBACK_DELAY,
    FALLBACK_FEE_BPS, MIN_CONSENSUS_WEIGHT,
};

/// A registered oracle data provider. Duplicate registrations of the same
/// principal are allowed and become distinct providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleProvider {
    pub id: u64,
    pub principal: AccountId,
    /// Data-type tags this provider supports (e.g. "price", "score").
    pub data_types: Vec<String>,
    /// Reliability score 0-100, weighted into every consensus.
    pub reliability: u8,
    pub active: bool,
}

/// One oracle data point. Submissions are append-only; re-submission adds a
/// newer record instead of overwriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSubmission {
    pub pool_id: u64,
    pub provider_id: u64,
    pub value: u64,
    pub data_type: String,
    /// Provider-claimed confidence 0-100.
    pub confidence: u8,
    pub submitted_at: u64,
}

/// Comparison operator applied to a source value against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equal,
}

impl Comparison {
    pub fn evaluate(self, value: u64, threshold: u64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::LessThan => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }
}

/// How per-source verdicts combine into a consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    /// Every configured source must have submitted and agree.
    And,
    /// Weighted majority of the sources that submitted.
    Or,
}

/// Lifecycle of a pool's automated resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Configured,
    Attempted,
    FallbackPending { since: u64 },
    Resolved,
}

/// Per-pool resolution configuration, attachable only before resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub pool_id: u64,
    /// Oracle provider ids consulted by the consensus.
    pub sources: Vec<u64>,
    pub comparison: Comparison,
    pub threshold: u64,
    pub combinator: Combinator,
    /// Total automated attempts allowed.
    pub retry_attempts: u32,
    /// Attempts consumed so far; visible state, not hidden control flow.
    pub attempts_used: u32,
    pub state: ResolutionState,
}

impl ResolutionConfig {
    pub(crate) fn mark_resolved(&mut self) {
        self.state = ResolutionState::Resolved;
    }
}

/// Result of an automated resolution attempt. `Indecisive` is a normal,
/// non-fatal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionOutcome {
    /// Consensus reached; the pool settled on this outcome.
    Resolved { winning_outcome: usize },
    /// No decisive consensus; one retry consumed.
    Indecisive { reason: String },
}

impl<L: Ledger> PoolEngine<L> {
    // --- Provider registry -------------------------------------------------

    /// Register an oracle provider. Returns its new id.
    pub fn register_oracle_provider(
        &mut self,
        principal: &str,
        data_types: Vec<String>,
    ) -> Result<u64> {
        if data_types.is_empty() {
            return Err(PoolError::InvalidCriteria(
                "provider needs at least one data type".to_string(),
            ));
        }
        let id = self.next_provider_id;
        self.providers.insert(
            id,
            OracleProvider {
                id,
                principal: principal.to_string(),
                data_types,
                reliability: DEFAULT_PROVIDER_RELIABILITY,
                active: true,
            },
        );
        self.next_provider_id += 1;
        self.emit(PoolEvent::OracleRegistered {
            provider_id: id,
            principal: principal.to_string(),
        });
        Ok(id)
    }

    /// Admin-gated reliability adjustment (0-100).
    pub fn set_provider_reliability(
        &mut self,
        caller: &str,
        provider_id: u64,
        reliability: u8,
    ) -> Result<()> {
        self.access.require_admin(caller)?;
        if reliability > 100 {
            return Err(PoolError::InvalidCriteria(
                "reliability must be 0-100".to_string(),
            ));
        }
        let provider = self
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| PoolError::ProviderNotFound(provider_id.to_string()))?;
        provider.reliability = reliability;
        Ok(())
    }

    /// Admin-gated activation toggle.
    pub fn set_provider_active(&mut self, caller: &str, provider_id: u64, active: bool) -> Result<()> {
        self.access.require_admin(caller)?;
        let provider = self
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| PoolError::ProviderNotFound(provider_id.to_string()))?;
        provider.active = active;
        Ok(())
    }

    pub fn get_oracle_provider(&self, provider_id: u64) -> Option<&OracleProvider> {
        self.providers.get(&provider_id)
    }

    // --- Data submission ---------------------------------------------------

    /// Submit a data point for a pool. The caller must own a registered,
    /// active provider supporting `data_type`. Submissions are retained
    /// append-only.
    pub fn submit_oracle_data(
        &mut self,
        caller: &str,
        pool_id: u64,
        value: u64,
        data_type: &str,
        confidence: u8,
    ) -> Result<()> {
        if confidence > 100 {
            return Err(PoolError::InvalidCriteria(
                "confidence must be 0-100".to_string(),
            ));
        }
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }

        let provider = self
            .providers
            .values()
            .find(|p| p.principal == caller && p.data_types.iter().any(|t| t == data_type))
            .ok_or_else(|| PoolError::ProviderNotFound(caller.to_string()))?;
        if !provider.active {
            return Err(PoolError::ProviderInactive(provider.id));
        }
        let provider_id = provider.id;

        self.submissions.push(OracleSubmission {
            pool_id,
            provider_id,
            value,
            data_type: data_type.to_string(),
            confidence,
            submitted_at: now,
        });
        self.emit(PoolEvent::OracleDataSubmitted {
            pool_id,
            provider_id,
            value,
            confidence,
        });
        Ok(())
    }

    /// Latest submission a provider made for a pool, if any.
    pub fn latest_submission(&self, pool_id: u64, provider_id: u64) -> Option<&OracleSubmission> {
        self.submissions
            .iter()
            .rev()
            .find(|s| s.pool_id == pool_id && s.provider_id == provider_id)
    }

    // --- Resolution configuration and attempts -----------------------------

    /// Attach a resolution configuration to a pool, once, before resolution.
    /// Only the pool creator or an admin may configure.
    #[allow(clippy::too_many_arguments)]
    pub fn configure_pool_resolution(
        &mut self,
        caller: &str,
        pool_id: u64,
        sources: Vec<u64>,
        comparison: Comparison,
        threshold: u64,
        combinator: Combinator,
        retry_attempts: u32,
    ) -> Result<()> {
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        if pool.creator != caller && !self.access.is_admin(caller) {
            return Err(PoolError::Unauthorized(format!(
                "{caller} may not configure resolution for pool {pool_id}"
            )));
        }
        if self.configs.contains_key(&pool_id) {
            return Err(PoolError::AlreadyConfigured(format!(
                "resolution for pool {pool_id}"
            )));
        }
        if sources.is_empty() || retry_attempts == 0 {
            return Err(PoolError::InvalidCriteria(
                "need at least one source and one retry attempt".to_string(),
            ));
        }
        for source in &sources {
            if !self.providers.contains_key(source) {
                return Err(PoolError::ProviderNotFound(source.to_string()));
            }
        }

        self.configs.insert(
            pool_id,
            ResolutionConfig {
                pool_id,
                sources: sources.clone(),
                comparison,
                threshold,
                combinator,
                retry_attempts,
                attempts_used: 0,
                state: ResolutionState::Configured,
            },
        );
        self.emit(PoolEvent::ResolutionConfigured { pool_id, sources });
        Ok(())
    }

    pub fn get_resolution_config(&self, pool_id: u64) -> Option<&ResolutionConfig> {
        self.configs.get(&pool_id)
    }

    /// Attempt automated resolution for a configured pool.
    ///
    /// Gathers each configured source's latest submission, weighs the
    /// per-source verdicts (weight = reliability x confidence) and, if the
    /// consensus is decisive, settles the pool exactly as the manual path
    /// would. An indecisive consensus consumes one retry and returns
    /// `Ok(Indecisive)`.
    pub fn attempt_automated_resolution(&mut self, pool_id: u64) -> Result<ResolutionOutcome> {
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        let config = self
            .configs
            .get(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        if config.attempts_used >= config.retry_attempts {
            return Err(PoolError::RetriesExhausted(pool_id));
        }

        let verdict = self.evaluate_consensus(config);
        match verdict {
            Consensus::Decisive {
                winning_outcome,
                participants,
            } => {
                self.apply_settlement(
                    pool_id,
                    winning_outcome,
                    ResolutionTrigger::Oracle { participants },
                    crate::FEE_BPS,
                )?;
                self.emit(PoolEvent::ResolutionAttempted {
                    pool_id,
                    decisive: true,
                });
                Ok(ResolutionOutcome::Resolved { winning_outcome })
            }
            Consensus::Indecisive(reason) => {
                let config = self.configs.get_mut(&pool_id).expect("checked above");
                config.attempts_used += 1;
                config.state = ResolutionState::Attempted;
                self.emit(PoolEvent::ResolutionAttempted {
                    pool_id,
                    decisive: false,
                });
                Ok(ResolutionOutcome::Indecisive { reason })
            }
        }
    }

    fn evaluate_consensus(&self, config: &ResolutionConfig) -> Consensus {
        let mut weight_for = 0u64;
        let mut weight_against = 0u64;
        let mut missing = 0usize;
        let mut unanimous_true = true;
        let mut unanimous_false = true;
        let mut participants = Vec::new();

        for source in &config.sources {
            let Some(submission) = self.latest_submission(config.pool_id, *source) else {
                missing += 1;
                continue;
            };
            let reliability = self
                .providers
                .get(source)
                .map(|p| p.reliability)
                .unwrap_or(0);
            let weight = reliability as u64 * submission.confidence as u64;
            let verdict = config
                .comparison
                .evaluate(submission.value, config.threshold);
            if verdict {
                weight_for += weight;
                unanimous_false = false;
            } else {
                weight_against += weight;
                unanimous_true = false;
            }
            participants.push(*source);
        }

        match config.combinator {
            Combinator::And => {
                if missing > 0 {
                    return Consensus::Indecisive(format!("{missing} source(s) missing"));
                }
                if unanimous_true {
                    Consensus::Decisive {
                        winning_outcome: 0,
                        participants,
                    }
                } else if unanimous_false {
                    Consensus::Decisive {
                        winning_outcome: 1,
                        participants,
                    }
                } else {
                    Consensus::Indecisive("sources disagree".to_string())
                }
            }
            Combinator::Or => {
                if participants.is_empty() {
                    return Consensus::Indecisive("no submissions".to_string());
                }
                if weight_for + weight_against < MIN_CONSENSUS_WEIGHT {
                    return Consensus::Indecisive("insufficient consensus weight".to_string());
                }
                match weight_for.cmp(&weight_against) {
                    std::cmp::Ordering::Greater => Consensus::Decisive {
                        winning_outcome: 0,
                        participants,
                    },
                    std::cmp::Ordering::Less => Consensus::Decisive {
                        winning_outcome: 1,
                        participants,
                    },
                    std::cmp::Ordering::Equal => {
                        Consensus::Indecisive("weighted tie".to_string())
                    }
                }
            }
        }
    }

    // --- Fallback path -----------------------------------------------------

    /// Arm the fallback path after automated resolution exhausted its
    /// retries. Starts the fixed fallback delay.
    pub fn trigger_fallback_resolution(&mut self, pool_id: u64, reason: &str) -> Result<()> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.settled() {
            return Err(PoolError::PoolSettled(pool_id));
        }
        let config = self
            .configs
            .get_mut(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        if config.attempts_used < config.retry_attempts {
            return Err(PoolError::FallbackNotReady(pool_id));
        }
        if matches!(config.state, ResolutionState::FallbackPending { .. }) {
            return Err(PoolError::AlreadyConfigured(format!(
                "fallback for pool {pool_id}"
            )));
        }
        config.state = ResolutionState::FallbackPending { since: now };
        self.emit(PoolEvent::FallbackTriggered {
            pool_id,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Creator-only settlement through the armed fallback path, with the
    /// reduced fallback fee, after the delay elapsed.
    pub fn manual_settle_fallback(
        &mut self,
        caller: &str,
        pool_id: u64,
        winning_outcome: usize,
    ) -> Result<()> {
        let now = self.ledger.block_height();
        let pool = self.pool(pool_id)?;
        if pool.creator != caller {
            return Err(PoolError::Unauthorized(format!(
                "{caller} is not the creator of pool {pool_id}"
            )));
        }
        let config = self
            .configs
            .get(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        let ResolutionState::FallbackPending { since } = config.state else {
            return Err(PoolError::FallbackNotReady(pool_id));
        };
        if now < since + FALLBACK_DELAY {
            return Err(PoolError::FallbackDelayActive(pool_id));
        }
        self.apply_settlement(
            pool_id,
            winning_outcome,
            ResolutionTrigger::Fallback,
            FALLBACK_FEE_BPS,
        )
    }

    // --- Resolution fee accounting -----------------------------------------

    /// Owner/admin collection of the platform share of an oracle-settled
    /// pool's fee pot, once.
    pub fn collect_resolution_fee(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        self.access.require_admin(caller)?;
        let fees = self
            .resolution_fees
            .get(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        if fees.platform_collected {
            return Err(PoolError::FeeAlreadyClaimed(pool_id));
        }
        let amount = fees.platform_share;
        let owner = self.access.owner().to_string();
        self.escrow_out(&owner, amount)?;
        self.resolution_fees
            .get_mut(&pool_id)
            .expect("checked above")
            .platform_collected = true;
        self.emit(PoolEvent::ResolutionFeeCollected { pool_id, amount });
        Ok(amount)
    }

    /// A participating provider's one-time claim of its share of the fee
    /// pot. A principal operating several participating providers claims
    /// one share per call until all of its shares are paid.
    pub fn claim_oracle_fee(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        let fees = self
            .resolution_fees
            .get(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        let owned: Vec<u64> = fees
            .participants
            .iter()
            .copied()
            .filter(|id| {
                self.providers
                    .get(id)
                    .is_some_and(|p| p.principal == caller)
            })
            .collect();
        if owned.is_empty() {
            return Err(PoolError::Unauthorized(format!(
                "{caller} did not participate in resolving pool {pool_id}"
            )));
        }
        let provider_id = owned
            .into_iter()
            .find(|id| !fees.claimed.contains(id))
            .ok_or(PoolError::FeeAlreadyClaimed(pool_id))?;
        let amount = fees.per_oracle;
        self.escrow_out(caller, amount)?;
        self.resolution_fees
            .get_mut(&pool_id)
            .expect("checked above")
            .claimed
            .insert(provider_id);
        self.emit(PoolEvent::OracleFeeClaimed {
            pool_id,
            provider_id,
            amount,
        });
        Ok(amount)
    }

    /// Admin-gated batch payout of every unclaimed provider share for a
    /// pool. Returns the total distributed.
    pub fn distribute_oracle_fees(&mut self, caller: &str, pool_id: u64) -> Result<u64> {
        self.access.require_admin(caller)?;
        let fees = self
            .resolution_fees
            .get(&pool_id)
            .ok_or(PoolError::ConfigNotFound(pool_id))?;
        let pending: Vec<(u64, AccountId)> = fees
            .participants
            .iter()
            .filter(|id| !fees.claimed.contains(id))
            .filter_map(|id| {
                self.providers
                    .get(id)
                    .map(|p| (*id, p.principal.clone()))
            })
            .collect();
        let per_oracle = fees.per_oracle;

        let mut distributed = 0;
        for (provider_id, principal) in pending {
            self.escrow_out(&principal, per_oracle)?;
            self.resolution_fees
                .get_mut(&pool_id)
                .expect("checked above")
                .claimed
                .insert(provider_id);
            self.emit(PoolEvent::OracleFeeClaimed {
                pool_id,
                provider_id,
                amount: per_oracle,
            });
            distributed += per_oracle;
        }
        Ok(distributed)
    }
}

enum Consensus {
    Decisive {
        winning_outcome: usize,
        participants: Vec<u64>,
    },
    Indecisive(String),
}
