//! Per-sender transaction sequencing.
//!
//! The engine itself is replay-agnostic; callers are expected to sequence
//! their own submissions. This helper tracks a strictly increasing nonce per
//! sender so a replayed or out-of-order command is rejected before it reaches
//! the engine.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NonceSequencer {
    next: BTreeMap<String, u64>,
}

impl NonceSequencer {
    /// The nonce the sender must use for its next submission.
    pub fn expected(&self, sender: &str) -> u64 {
        self.next.get(sender).copied().unwrap_or(0)
    }

    /// Accept `nonce` for `sender` if it matches the expected value, then
    /// advance. Stale and skipped nonces are both rejected.
    pub fn record(&mut self, sender: &str, nonce: u64) -> Result<()> {
        let expected = self.expected(sender);
        if nonce != expected {
            bail!("stale nonce for {sender}: expected {expected}, got {nonce}");
        }
        self.next.insert(sender.to_string(), expected + 1);
        Ok(())
    }

    /// Take the next nonce for `sender` without the caller supplying one.
    pub fn auto(&mut self, sender: &str) -> u64 {
        let nonce = self.expected(sender);
        self.next.insert(sender.to_string(), nonce + 1);
        nonce
    }
}
