//! # Betpool CLI
//!
//! Command-line interface for peer-funded binary prediction pools. Drives the
//! engine against a local JSON state file: one in-memory ledger, its pools,
//! oracle registry and dispute log all persist between invocations.

use std::path::PathBuf;

use anyhow::{bail, Result};
use betpool_core::{evidence_digest, Combinator, Comparison, Ledger, ResolutionOutcome};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;

mod sequencer;
mod store;

use store::Store;

#[derive(Parser)]
#[command(name = "betpool")]
#[command(about = "Peer-funded binary prediction pools with escrowed settlement")]
#[command(version)]
struct Cli {
    /// Path to the JSON state file
    #[arg(long, global = true, default_value = "betpool-state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh state file with the given platform owner
    Init {
        /// Platform owner principal (receives settlement fees)
        #[arg(long, default_value = "owner")]
        owner: String,
    },
    /// Credit an account on the dev ledger
    Fund {
        account: String,
        amount: u64,
    },
    /// Advance the dev ledger by a number of blocks
    Advance {
        #[arg(default_value = "1")]
        blocks: u64,
    },
    /// Create a new binary prediction pool
    CreatePool {
        #[arg(long)]
        from: String,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        /// First outcome label
        #[arg(short = 'a', long)]
        outcome_a: String,
        /// Second outcome label
        #[arg(short = 'b', long)]
        outcome_b: String,
        /// Betting window in blocks
        #[arg(long)]
        duration: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Stake an amount on one outcome of a pool
    Bet {
        #[arg(long)]
        from: String,
        pool_id: u64,
        /// Outcome index (0 or 1)
        outcome: usize,
        amount: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Stake with balance and overflow pre-checks
    BetSafe {
        #[arg(long)]
        from: String,
        pool_id: u64,
        /// Outcome index (0 or 1)
        outcome: usize,
        amount: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Settle a pool manually (creator only)
    Settle {
        #[arg(long)]
        from: String,
        pool_id: u64,
        outcome: usize,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Settle a pool as an attesting oracle provider
    SettleOracle {
        #[arg(long)]
        from: String,
        pool_id: u64,
        outcome: usize,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Claim winnings from a settled pool
    Claim {
        #[arg(long)]
        from: String,
        pool_id: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Refund a stake from an expired-unsettled or overturned pool
    Refund {
        #[arg(long)]
        from: String,
        pool_id: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Request a pre-settlement partial withdrawal
    RequestWithdrawal {
        #[arg(long)]
        from: String,
        pool_id: u64,
        amount: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Approve a pending withdrawal (admin only)
    ApproveWithdrawal {
        #[arg(long)]
        from: String,
        withdrawal_id: u64,
    },
    /// Reject a pending withdrawal (admin only)
    RejectWithdrawal {
        #[arg(long)]
        from: String,
        withdrawal_id: u64,
    },
    /// Sweep the unclaimed escrow of a settled, expired pool (creator only)
    EmergencyWithdraw {
        #[arg(long)]
        from: String,
        pool_id: u64,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Register an oracle data provider
    RegisterOracle {
        /// Principal operating the provider
        #[arg(long)]
        principal: String,
        /// Comma-separated data type tags, e.g. "price,score"
        #[arg(long)]
        data_types: String,
    },
    /// Submit an oracle data point for a pool
    SubmitData {
        #[arg(long)]
        from: String,
        pool_id: u64,
        value: u64,
        #[arg(long)]
        data_type: String,
        /// Confidence 0-100
        #[arg(long, default_value = "100")]
        confidence: u8,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Attach an automated resolution config to a pool
    ConfigureResolution {
        #[arg(long)]
        from: String,
        pool_id: u64,
        /// Comma-separated oracle provider ids
        #[arg(long)]
        sources: String,
        /// gt, ge, lt, le or eq
        #[arg(long)]
        comparison: String,
        #[arg(long)]
        threshold: u64,
        /// "and" (unanimous) or "or" (weighted majority)
        #[arg(long, default_value = "and")]
        combinator: String,
        #[arg(long, default_value = "3")]
        retries: u32,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Attempt automated resolution from submitted oracle data
    Resolve {
        pool_id: u64,
    },
    /// Flag a pool for manual fallback after retries are exhausted
    Fallback {
        pool_id: u64,
        #[arg(long, default_value = "oracle consensus unavailable")]
        reason: String,
    },
    /// Settle a fallback-flagged pool manually at the reduced fee
    FallbackSettle {
        #[arg(long)]
        from: String,
        pool_id: u64,
        outcome: usize,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Collect the platform share of an oracle settlement fee (admin only)
    CollectFee {
        #[arg(long)]
        from: String,
        pool_id: u64,
    },
    /// Claim one provider's oracle fee share
    ClaimOracleFee {
        #[arg(long)]
        from: String,
        pool_id: u64,
    },
    /// Push unclaimed oracle fee shares out to providers (admin only)
    DistributeFees {
        #[arg(long)]
        from: String,
        pool_id: u64,
    },
    /// Open a dispute against a settled pool (escrows a bond)
    Dispute {
        #[arg(long)]
        from: String,
        pool_id: u64,
        #[arg(long)]
        reason: String,
        /// Free-form evidence; stored as a sha256 digest
        #[arg(long)]
        evidence: Option<String>,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Vote on an open dispute
    Vote {
        #[arg(long)]
        from: String,
        dispute_id: u64,
        /// Vote against the dispute instead of for it
        #[arg(long)]
        against: bool,
    },
    /// Tally a dispute after its voting deadline
    ResolveDispute {
        dispute_id: u64,
    },
    /// Register a referrer for future bonus payouts
    Refer {
        #[arg(long)]
        from: String,
        referrer: String,
    },
    /// Grant admin rights (owner only)
    AddAdmin {
        #[arg(long)]
        from: String,
        account: String,
    },
    /// Show one pool in detail
    Info {
        pool_id: u64,
    },
    /// List pools
    List {
        #[arg(long, default_value = "0")]
        offset: u64,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show an account balance
    Balance {
        account: String,
    },
    /// Show the most recent engine events
    Events {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn parse_comparison(raw: &str) -> Result<Comparison> {
    Ok(match raw {
        "gt" => Comparison::GreaterThan,
        "ge" => Comparison::GreaterOrEqual,
        "lt" => Comparison::LessThan,
        "le" => Comparison::LessOrEqual,
        "eq" => Comparison::Equal,
        other => bail!("unknown comparison '{other}' (expected gt, ge, lt, le or eq)"),
    })
}

fn parse_combinator(raw: &str) -> Result<Combinator> {
    Ok(match raw {
        "and" => Combinator::And,
        "or" => Combinator::Or,
        other => bail!("unknown combinator '{other}' (expected and or or)"),
    })
}

fn parse_id_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("invalid id '{part}'"))
        })
        .collect()
}

/// Validate or auto-assign the caller's transaction nonce.
fn sequence(store: &mut Store, sender: &str, nonce: Option<u64>) -> Result<u64> {
    match nonce {
        Some(n) => {
            store.nonces.record(sender, n)?;
            Ok(n)
        }
        None => Ok(store.nonces.auto(sender)),
    }
}

fn print_pool(store: &Store, pool_id: u64) -> Result<()> {
    let pool = store
        .engine
        .get_pool(pool_id)
        .ok_or_else(|| anyhow::anyhow!("pool {pool_id} not found"))?;
    let stats = store.engine.get_pool_stats(pool_id)?;

    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Pool".yellow().bold(), pool.id);
    println!("{}: {}", "Title".yellow().bold(), pool.title);
    println!("{}: {}", "Creator".yellow().bold(), pool.creator);
    for (i, outcome) in pool.outcomes.iter().enumerate() {
        println!(
            "{}: {} ({} staked)",
            format!("Outcome {i}").yellow().bold(),
            outcome,
            pool.totals[i].to_string().cyan()
        );
    }
    println!("{}: {}", "Gross".yellow().bold(), stats.gross);
    println!("{}: {}", "Bettors".yellow().bold(), stats.bettor_count);
    println!("{}: {}", "Expiry".yellow().bold(), pool.expiry);
    match &pool.settlement {
        Some(s) => {
            let label = if s.overturned {
                "settled (overturned)".red().to_string()
            } else {
                "settled".green().to_string()
            };
            println!("{}: {}", "Status".yellow().bold(), label);
            println!(
                "{}: {} ({})",
                "Winner".yellow().bold(),
                s.winning_outcome,
                pool.outcomes[s.winning_outcome]
            );
            println!("{}: {}", "Fee".yellow().bold(), s.fee);
            println!("{}: {}", "Net pool".yellow().bold(), s.net_pool);
            println!("{}: {}", "Paid out".yellow().bold(), stats.paid_out);
            println!(
                "{}: {}",
                "Remaining escrow".yellow().bold(),
                stats.remaining_escrow
            );
        }
        None => {
            let status = if pool.expired(store.engine.block_height()) {
                "expired, awaiting settlement or refunds".red().to_string()
            } else {
                "open".green().to_string()
            };
            println!("{}: {}", "Status".yellow().bold(), status);
        }
    }
    println!("{}", "═".repeat(50).bright_black());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let path = cli.state;

    match cli.command {
        Commands::Init { owner } => {
            let store = Store::new(&owner);
            store.save(&path)?;
            println!(
                "{} owner {} at {}",
                "Initialized".green().bold(),
                owner.cyan(),
                path.display()
            );
            return Ok(());
        }
        command => {
            let mut store = Store::load(&path)?;
            let mut dirty = true;

            match command {
                Commands::Init { .. } => unreachable!("handled above"),

                Commands::Fund { account, amount } => {
                    store.engine.ledger_mut().fund(&account, amount);
                    println!(
                        "{} {} with {}",
                        "Funded".green().bold(),
                        account.cyan(),
                        amount.to_string().yellow()
                    );
                }
                Commands::Advance { blocks } => {
                    store.engine.ledger_mut().advance(blocks);
                    println!(
                        "{}: now at block {}",
                        "Advanced".green().bold(),
                        store.engine.block_height().to_string().cyan()
                    );
                }
                Commands::CreatePool {
                    from,
                    title,
                    description,
                    outcome_a,
                    outcome_b,
                    duration,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let id = store.engine.create_pool(
                        &from,
                        &title,
                        &description,
                        &outcome_a,
                        &outcome_b,
                        duration,
                    )?;
                    println!("{}", "Pool Created!".green().bold());
                    print_pool(&store, id)?;
                }
                Commands::Bet {
                    from,
                    pool_id,
                    outcome,
                    amount,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store.engine.place_bet(&from, pool_id, outcome, amount)?;
                    println!(
                        "{}: {} staked {} on outcome {} of pool {}",
                        "Bet Placed".green().bold(),
                        from.cyan(),
                        amount.to_string().yellow(),
                        outcome,
                        pool_id
                    );
                }
                Commands::BetSafe {
                    from,
                    pool_id,
                    outcome,
                    amount,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store.engine.place_bet_safe(&from, pool_id, outcome, amount)?;
                    println!(
                        "{}: {} staked {} on outcome {} of pool {}",
                        "Bet Placed".green().bold(),
                        from.cyan(),
                        amount.to_string().yellow(),
                        outcome,
                        pool_id
                    );
                }
                Commands::Settle {
                    from,
                    pool_id,
                    outcome,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let stats = store.engine.settle_pool_enhanced(&from, pool_id, outcome)?;
                    println!("{}", "Pool Settled!".green().bold());
                    println!(
                        "  gross {} | fee {} | net {} | {} winner(s) on outcome {}",
                        stats.gross.to_string().cyan(),
                        stats.fee.to_string().yellow(),
                        stats.net_pool.to_string().cyan(),
                        stats.winner_count,
                        stats.winning_outcome
                    );
                }
                Commands::SettleOracle {
                    from,
                    pool_id,
                    outcome,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store.engine.settle_pool_oracle(&from, pool_id, outcome)?;
                    println!(
                        "{}: pool {} settled on outcome {} by oracle attestation",
                        "Pool Settled".green().bold(),
                        pool_id,
                        outcome
                    );
                }
                Commands::Claim {
                    from,
                    pool_id,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let payout = store.engine.claim_winnings(&from, pool_id)?;
                    println!(
                        "{}: {} received {}",
                        "Winnings Claimed".green().bold(),
                        from.cyan(),
                        payout.total().to_string().yellow()
                    );
                    if payout.early_bird_bonus + payout.volume_bonus + payout.referral_bonus > 0 {
                        println!(
                            "  base {} | early-bird {} | volume {} | referral {}",
                            payout.base,
                            payout.early_bird_bonus,
                            payout.volume_bonus,
                            payout.referral_bonus
                        );
                    }
                }
                Commands::Refund {
                    from,
                    pool_id,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let amount = store.engine.request_refund(&from, pool_id)?;
                    println!(
                        "{}: {} refunded {}",
                        "Refund Issued".green().bold(),
                        from.cyan(),
                        amount.to_string().yellow()
                    );
                }
                Commands::RequestWithdrawal {
                    from,
                    pool_id,
                    amount,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let id = store.engine.request_withdrawal(&from, pool_id, amount)?;
                    println!(
                        "{}: request {} for {} pending approval",
                        "Withdrawal Requested".green().bold(),
                        id,
                        amount.to_string().yellow()
                    );
                }
                Commands::ApproveWithdrawal {
                    from,
                    withdrawal_id,
                } => {
                    store.engine.approve_withdrawal(&from, withdrawal_id)?;
                    println!("{}: {}", "Withdrawal Approved".green().bold(), withdrawal_id);
                }
                Commands::RejectWithdrawal {
                    from,
                    withdrawal_id,
                } => {
                    store.engine.reject_withdrawal(&from, withdrawal_id)?;
                    println!("{}: {}", "Withdrawal Rejected".red().bold(), withdrawal_id);
                }
                Commands::EmergencyWithdraw {
                    from,
                    pool_id,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let amount = store.engine.emergency_withdrawal(&from, pool_id)?;
                    println!(
                        "{}: {} swept from pool {}",
                        "Emergency Withdrawal".yellow().bold(),
                        amount.to_string().yellow(),
                        pool_id
                    );
                }
                Commands::RegisterOracle {
                    principal,
                    data_types,
                } => {
                    let types: Vec<String> = data_types
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                    let id = store.engine.register_oracle_provider(&principal, types)?;
                    println!(
                        "{}: provider {} for {}",
                        "Oracle Registered".green().bold(),
                        id.to_string().cyan(),
                        principal
                    );
                }
                Commands::SubmitData {
                    from,
                    pool_id,
                    value,
                    data_type,
                    confidence,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store
                        .engine
                        .submit_oracle_data(&from, pool_id, value, &data_type, confidence)?;
                    println!(
                        "{}: {}={} (confidence {}) for pool {}",
                        "Data Submitted".green().bold(),
                        data_type,
                        value.to_string().cyan(),
                        confidence,
                        pool_id
                    );
                }
                Commands::ConfigureResolution {
                    from,
                    pool_id,
                    sources,
                    comparison,
                    threshold,
                    combinator,
                    retries,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store.engine.configure_pool_resolution(
                        &from,
                        pool_id,
                        parse_id_list(&sources)?,
                        parse_comparison(&comparison)?,
                        threshold,
                        parse_combinator(&combinator)?,
                        retries,
                    )?;
                    println!(
                        "{}: pool {} resolves {} {} {} with {} retries",
                        "Resolution Configured".green().bold(),
                        pool_id,
                        comparison,
                        threshold,
                        combinator,
                        retries
                    );
                }
                Commands::Resolve { pool_id } => {
                    match store.engine.attempt_automated_resolution(pool_id)? {
                        ResolutionOutcome::Resolved { winning_outcome } => {
                            println!(
                                "{}: pool {} settled on outcome {}",
                                "Consensus Reached".green().bold(),
                                pool_id,
                                winning_outcome
                            );
                        }
                        ResolutionOutcome::Indecisive { reason } => {
                            println!(
                                "{}: {} (one retry consumed)",
                                "Indecisive".yellow().bold(),
                                reason
                            );
                        }
                    }
                }
                Commands::Fallback { pool_id, reason } => {
                    store.engine.trigger_fallback_resolution(pool_id, &reason)?;
                    println!(
                        "{}: pool {} awaiting manual settlement after the delay",
                        "Fallback Triggered".yellow().bold(),
                        pool_id
                    );
                }
                Commands::FallbackSettle {
                    from,
                    pool_id,
                    outcome,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    store.engine.manual_settle_fallback(&from, pool_id, outcome)?;
                    println!(
                        "{}: pool {} settled on outcome {} at the reduced fee",
                        "Fallback Settled".green().bold(),
                        pool_id,
                        outcome
                    );
                }
                Commands::CollectFee { from, pool_id } => {
                    let amount = store.engine.collect_resolution_fee(&from, pool_id)?;
                    println!(
                        "{}: platform share {}",
                        "Fee Collected".green().bold(),
                        amount.to_string().yellow()
                    );
                }
                Commands::ClaimOracleFee { from, pool_id } => {
                    let amount = store.engine.claim_oracle_fee(&from, pool_id)?;
                    println!(
                        "{}: {} received {}",
                        "Oracle Fee Claimed".green().bold(),
                        from.cyan(),
                        amount.to_string().yellow()
                    );
                }
                Commands::DistributeFees { from, pool_id } => {
                    let total = store.engine.distribute_oracle_fees(&from, pool_id)?;
                    println!(
                        "{}: {} pushed to providers",
                        "Fees Distributed".green().bold(),
                        total.to_string().yellow()
                    );
                }
                Commands::Dispute {
                    from,
                    pool_id,
                    reason,
                    evidence,
                    nonce,
                } => {
                    sequence(&mut store, &from, nonce)?;
                    let digest = evidence.map(|e| evidence_digest(e.as_bytes()));
                    let id = store.engine.create_dispute(&from, pool_id, &reason, digest)?;
                    if let Some(dispute) = store.engine.get_dispute(id) {
                        println!(
                            "{}: dispute {} opened, bond {} escrowed, voting until block {}",
                            "Dispute Created".yellow().bold(),
                            id,
                            dispute.bond.to_string().yellow(),
                            dispute.voting_deadline
                        );
                    }
                }
                Commands::Vote {
                    from,
                    dispute_id,
                    against,
                } => {
                    store.engine.vote_on_dispute(&from, dispute_id, !against)?;
                    let side = if against { "against".red() } else { "for".green() };
                    println!(
                        "{}: {} voted {} dispute {}",
                        "Vote Cast".green().bold(),
                        from.cyan(),
                        side,
                        dispute_id
                    );
                }
                Commands::ResolveDispute { dispute_id } => {
                    let resolution = store.engine.resolve_dispute(dispute_id)?;
                    println!(
                        "{}: {:?}",
                        "Dispute Resolved".green().bold(),
                        resolution
                    );
                }
                Commands::Refer { from, referrer } => {
                    store.engine.register_referral(&from, &referrer)?;
                    println!(
                        "{}: {} referred by {}",
                        "Referral Registered".green().bold(),
                        from.cyan(),
                        referrer.cyan()
                    );
                }
                Commands::AddAdmin { from, account } => {
                    store.engine.add_admin(&from, &account)?;
                    println!("{}: {}", "Admin Added".green().bold(), account.cyan());
                }
                Commands::Info { pool_id } => {
                    print_pool(&store, pool_id)?;
                    dirty = false;
                }
                Commands::List { offset, limit } => {
                    println!(
                        "{} ({} total, block {}, {})",
                        "Pools".green().bold(),
                        store.engine.pool_count(),
                        store.engine.block_height(),
                        Local::now().format("%Y-%m-%d %H:%M:%S")
                    );
                    for pool in store.engine.list_pools(offset, limit) {
                        let status = match &pool.settlement {
                            Some(s) if s.overturned => "overturned".red().to_string(),
                            Some(_) => "settled".green().to_string(),
                            None => "open".cyan().to_string(),
                        };
                        println!(
                            "  {} {} [{}] gross {}",
                            format!("#{}", pool.id).yellow(),
                            pool.title,
                            status,
                            pool.gross()
                        );
                    }
                    dirty = false;
                }
                Commands::Balance { account } => {
                    println!(
                        "{}: {} holds {}",
                        "Balance".green().bold(),
                        account.cyan(),
                        store.engine.ledger().balance(&account).to_string().yellow()
                    );
                    dirty = false;
                }
                Commands::Events { limit } => {
                    let events = store.engine.events();
                    let start = events.len().saturating_sub(limit);
                    for event in &events[start..] {
                        println!("  {:?}", event);
                    }
                    dirty = false;
                }
            }

            if dirty {
                store.save(&path)?;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
