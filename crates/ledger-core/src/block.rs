use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::error::MiningError;
use crate::mine::{search_nonce_parallel, CancelToken};
use crate::pow::{digest_with_nonce, meets_target};
use crate::transaction::{CanonicalTransaction, Transaction};

/// An ordered batch of transactions sealed by a proof-of-work hash.
///
/// Fields are only changed through [`Block::mine`] and
/// [`Block::mine_parallel`], which keep `hash` in step with the contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

/// Hashed fields minus the nonce, serialized in preimage order.
#[derive(Serialize)]
struct Preimage<'a> {
    index: u64,
    timestamp: u64,
    transactions: Vec<CanonicalTransaction<'a>>,
    previous_hash: &'a str,
}

/// Mutable access to a block's fields for building tamper fixtures in tests.
/// Nothing in the ledger uses it.
#[doc(hidden)]
pub struct BlockFixture<'a> {
    pub index: &'a mut u64,
    pub timestamp: &'a mut u64,
    pub transactions: &'a mut Vec<Transaction>,
    pub previous_hash: &'a mut String,
    pub nonce: &'a mut u64,
    pub hash: &'a mut String,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: impl Into<String>) -> Self {
        Self::with_timestamp(index, now_secs(), transactions, previous_hash)
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// Compact JSON of `{index, timestamp, transactions, previous_hash, nonce}`
    /// up to and including `"nonce":`, so the nonce can be appended per attempt.
    fn preimage_prefix(&self) -> Vec<u8> {
        let preimage = Preimage {
            index: self.index,
            timestamp: self.timestamp,
            transactions: self.transactions.iter().map(Transaction::canonical).collect(),
            previous_hash: &self.previous_hash,
        };
        let mut bytes = serde_json::to_vec(&preimage).expect("block preimage serializes to JSON");
        bytes.pop(); // closing brace
        bytes.extend_from_slice(br#","nonce":"#);
        bytes
    }

    /// Lowercase hex SHA-256 over every field except `hash`.
    pub fn calculate_hash(&self) -> String {
        hex::encode(digest_with_nonce(&self.preimage_prefix(), self.nonce))
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        meets_target(&self.hash, difficulty)
    }

    /// Increments the nonce until the hash has `difficulty` leading zero hex
    /// characters. Blocks the caller with no upper bound.
    pub fn mine(&mut self, difficulty: usize) {
        let prefix = self.preimage_prefix();
        while !meets_target(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = hex::encode(digest_with_nonce(&prefix, self.nonce));
        }
        info!(
            "Mined block {} with nonce {} and hash {}",
            self.index, self.nonce, self.hash
        );
    }

    /// Parallel, cancellable variant of [`Block::mine`]. On cancellation the
    /// block is left exactly as it was.
    pub fn mine_parallel(
        &mut self,
        difficulty: usize,
        workers: Option<usize>,
        cancel: &CancelToken,
    ) -> Result<(), MiningError> {
        if self.meets_difficulty(difficulty) {
            return Ok(());
        }
        let prefix = self.preimage_prefix();
        let (nonce, hash) = search_nonce_parallel(&prefix, difficulty, workers, cancel)?;
        self.nonce = nonce;
        self.hash = hex::encode(hash);
        info!(
            "Mined block {} with nonce {} and hash {}",
            self.index, self.nonce, self.hash
        );
        Ok(())
    }

    #[doc(hidden)]
    pub fn fixture_mut(&mut self) -> BlockFixture<'_> {
        BlockFixture {
            index: &mut self.index,
            timestamp: &mut self.timestamp,
            transactions: &mut self.transactions,
            previous_hash: &mut self.previous_hash,
            nonce: &mut self.nonce,
            hash: &mut self.hash,
        }
    }
}
