use rsa::RsaPublicKey;
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::config::LedgerConfig;
use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::{ChainViolation, ConfigError, LedgerError};
use crate::mine::CancelToken;
use crate::transaction::Transaction;
use crate::wallet::derive_address;

/// Single-writer ledger: the block chain plus the pool of accepted but
/// unmined transactions.
///
/// Every mutation goes through `&mut self`, so a solvency check and the
/// append that follows it can never interleave with another submission.
/// Callers sharing a ledger across threads wrap the whole value in a lock.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: usize,
    mining_reward: i64,
    workers: Option<usize>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// The first block: no transactions and the `"0"` sentinel as predecessor.
pub fn genesis_block() -> Block {
    Block::new(0, vec![], GENESIS_PREVIOUS_HASH)
}

impl Ledger {
    pub fn new() -> Self {
        Self::from_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: LedgerConfig) -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
            workers: config.workers,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block exists from construction.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // chain[0] is created in the constructor and blocks are never removed
        &self.chain[self.chain.len() - 1]
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn mining_reward(&self) -> i64 {
        self.mining_reward
    }

    /// Mutable blocks for building tamper fixtures in tests. The slice cannot
    /// grow or shrink the chain.
    #[doc(hidden)]
    pub fn chain_mut_for_fixture(&mut self) -> &mut [Block] {
        &mut self.chain
    }

    /// Net amount received by `address` over every mined block and then the
    /// pending pool. Saturates at the `i64` bounds.
    pub fn get_balance(&self, address: &str) -> i64 {
        let wide = self.wide_balance(address);
        i64::try_from(wide).unwrap_or(if wide < 0 { i64::MIN } else { i64::MAX })
    }

    /// The balance summed in `i128`, which no realistic chain of `i64`
    /// amounts can overflow.
    fn wide_balance(&self, address: &str) -> i128 {
        self.chain
            .iter()
            .flat_map(|block| block.transactions())
            .chain(self.pending.iter())
            .fold(0i128, |mut balance, tx| {
                if tx.sender.as_deref() == Some(address) {
                    balance -= i128::from(tx.amount);
                }
                if tx.receiver.as_deref() == Some(address) {
                    balance += i128::from(tx.amount);
                }
                balance
            })
    }

    /// Rejects a credit that would push `receiver` past `i64::MAX`.
    fn check_credit(&self, receiver: &str, amount: i64) -> Result<(), LedgerError> {
        if self.wide_balance(receiver) + i128::from(amount) > i128::from(i64::MAX) {
            return Err(LedgerError::AmountOverflow {
                receiver: receiver.to_string(),
                amount,
            });
        }
        Ok(())
    }

    fn check_admission(&self, tx: &Transaction) -> Result<(), LedgerError> {
        if tx.sender.is_none() && tx.receiver.is_none() {
            return Err(LedgerError::MissingParties);
        }
        let Some(receiver) = tx.receiver.as_deref() else {
            return Err(LedgerError::MissingReceiver);
        };
        if tx.amount <= 0 {
            return Err(LedgerError::NonPositiveAmount { amount: tx.amount });
        }
        if let Some(sender) = tx.sender.as_deref() {
            let balance = self.get_balance(sender);
            if balance < tx.amount {
                return Err(LedgerError::InsufficientBalance {
                    sender: sender.to_string(),
                    balance,
                    amount: tx.amount,
                });
            }
            if sender == receiver {
                return Ok(());
            }
        }
        self.check_credit(receiver, tx.amount)
    }

    /// Validates `tx` against the admission rules and appends it to the
    /// pending pool. Pending debits count against the sender's balance.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        if let Err(err) = self.check_admission(&tx) {
            warn!("rejected transaction: {}", err);
            return Err(err);
        }
        debug!(
            "accepted transaction {:?} -> {:?} ({})",
            tx.sender, tx.receiver, tx.amount
        );
        self.pending.push(tx);
        Ok(())
    }

    /// Admits a signed transfer after checking that `public_key` hashes to the
    /// sender's address and that the signature verifies under it.
    pub fn submit_signed(
        &mut self,
        tx: Transaction,
        public_key: &RsaPublicKey,
    ) -> Result<(), LedgerError> {
        let Some(sender) = tx.sender.as_deref() else {
            return Err(LedgerError::UnexpectedReward);
        };
        if derive_address(public_key)? != sender {
            warn!("rejected transaction from {}: key does not match sender", sender);
            return Err(LedgerError::SenderKeyMismatch);
        }
        if !tx.verify(public_key)? {
            warn!("rejected transaction from {}: bad signature", sender);
            return Err(LedgerError::InvalidSignature);
        }
        self.add_transaction(tx)
    }

    /// Packages the pending pool plus a reward for `miner` into a new block,
    /// mines it and appends it to the chain.
    pub fn mine_pending_transactions(&mut self, miner: &str) -> Result<&Block, LedgerError> {
        self.mine_pending_transactions_with(miner, &CancelToken::new())
    }

    /// Cancellable form of [`Ledger::mine_pending_transactions`]. When `cancel`
    /// fires first the chain is untouched and the pool is restored.
    pub fn mine_pending_transactions_with(
        &mut self,
        miner: &str,
        cancel: &CancelToken,
    ) -> Result<&Block, LedgerError> {
        // The reward is minted here and never goes through admission.
        if let Err(err) = self.check_credit(miner, self.mining_reward) {
            warn!("refusing to mine: {}", err);
            return Err(err);
        }
        let mut transactions = std::mem::take(&mut self.pending);
        transactions.push(Transaction::reward(miner, self.mining_reward));

        let mut block = Block::new(
            self.chain.len() as u64,
            transactions,
            self.latest_block().hash(),
        );
        if let Err(err) = block.mine_parallel(self.difficulty, self.workers, cancel) {
            warn!("mining block {} stopped: {}", block.index(), err);
            let mut restored = block.into_transactions();
            restored.pop();
            self.pending = restored;
            return Err(err.into());
        }

        info!(
            "appended block {} with {} transactions",
            block.index(),
            block.transactions().len()
        );
        self.chain.push(block);
        Ok(self.latest_block())
    }

    fn violations_at(&self, position: usize) -> Vec<ChainViolation> {
        let block = &self.chain[position];
        let previous = &self.chain[position - 1];
        let index = block.index();
        let mut found = Vec::new();
        if block.hash() != block.calculate_hash() {
            found.push(ChainViolation::HashMismatch { index });
        }
        if block.previous_hash() != previous.hash() {
            found.push(ChainViolation::BrokenLink { index });
        }
        if !block.meets_difficulty(self.difficulty) {
            found.push(ChainViolation::DifficultyNotMet { index });
        }
        found
    }

    /// First broken rule walking the chain from block 1; the genesis block is
    /// not checked.
    pub fn validate_chain(&self) -> Result<(), ChainViolation> {
        for position in 1..self.chain.len() {
            if let Some(violation) = self.violations_at(position).into_iter().next() {
                warn!("chain invalid: {}", violation);
                return Err(violation);
            }
        }
        Ok(())
    }

    /// Every broken rule in the chain, for diagnostics.
    pub fn chain_violations(&self) -> Vec<ChainViolation> {
        (1..self.chain.len())
            .flat_map(|position| self.violations_at(position))
            .collect()
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate_chain().is_ok()
    }
}
