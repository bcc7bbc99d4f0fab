//! JSON state file backing the CLI.
//!
//! The whole engine (pools, bets, ledger, disputes, oracle registry) plus the
//! caller-side nonce sequencer serialize into one file, loaded at the start
//! of every command and written back after a successful mutation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use betpool_core::{EngineAccounts, MemoryLedger, PoolEngine};
use serde::{Deserialize, Serialize};

use crate::sequencer::NonceSequencer;

#[derive(Debug, Serialize, Deserialize)]
pub struct Store {
    pub engine: PoolEngine<MemoryLedger>,
    pub nonces: NonceSequencer,
}

impl Store {
    pub fn new(owner: &str) -> Self {
        Store {
            engine: PoolEngine::new(
                MemoryLedger::new(),
                EngineAccounts::default(),
                owner.to_string(),
            ),
            nonces: NonceSequencer::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("no state file at {} (run `betpool init` first)", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("corrupt state file at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("serializing state")?;
        fs::write(path, raw).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use betpool_core::Ledger;

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join("betpool-store-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        let mut store = Store::new("owner");
        store.engine.ledger_mut().fund("alice", 5_000_000);
        store.nonces.record("alice", 0).unwrap();
        store.save(&path).unwrap();

        let loaded = Store::load(&path).unwrap();
        assert_eq!(loaded.engine.ledger().balance("alice"), 5_000_000);
        assert_eq!(loaded.nonces.expected("alice"), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_init_hint() {
        let err = Store::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("betpool init"));
    }
}
