use thiserror::Error;

/// Failures raised while signing or verifying a single transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("reward transactions have no sender and cannot be signed")]
    SigningNotAllowed,

    #[error("transaction has a sender but carries no signature")]
    MissingSignature,

    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MiningError {
    #[error("mining was cancelled before a valid nonce was found")]
    Cancelled,

    #[error("every nonce was tried without meeting the target")]
    Exhausted,

    #[error("failed to start mining workers: {0}")]
    WorkerPool(String),
}

/// Admission and mining failures reported by the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid transaction: both sender and receiver are missing")]
    MissingParties,

    #[error("invalid transaction: receiver is missing")]
    MissingReceiver,

    #[error("invalid transaction: amount must be greater than zero (got {amount})")]
    NonPositiveAmount { amount: i64 },

    #[error("insufficient balance: {sender} has {balance}, needs {amount}")]
    InsufficientBalance {
        sender: String,
        balance: i64,
        amount: i64,
    },

    #[error("public key does not belong to the transaction sender")]
    SenderKeyMismatch,

    #[error("transaction signature does not verify")]
    InvalidSignature,

    #[error("reward transactions are only created by mining")]
    UnexpectedReward,

    #[error("crediting {amount} would overflow the balance of {receiver}")]
    AmountOverflow { receiver: String, amount: i64 },

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// A single broken rule found while replaying the chain.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("block {index}: stored hash does not match its contents")]
    HashMismatch { index: u64 },

    #[error("block {index}: previous hash does not match the preceding block")]
    BrokenLink { index: u64 },

    #[error("block {index}: hash does not meet the proof-of-work target")]
    DifficultyNotMet { index: u64 },
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("RSA keys must be at least 2048 bits (requested {bits})")]
    KeyTooSmall { bits: usize },

    #[error("failed to generate keypair: {0}")]
    KeyGeneration(String),

    #[error("failed to encode or decode key material: {0}")]
    KeyEncoding(String),

    #[error("failed to decrypt private key: wrong passphrase or corrupted key file")]
    Decryption,

    #[error("stored public key does not match the decrypted private key")]
    KeyMismatch,

    #[error("stored address {stored} does not match derived address {derived}")]
    AddressMismatch { stored: String, derived: String },

    #[error("key file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("key file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("key file contains invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("mining reward must be positive (got {0})")]
    NonPositiveReward(i64),

    #[error("difficulty {difficulty} exceeds the {max} hex characters of a hash")]
    DifficultyTooHigh { difficulty: usize, max: usize },

    #[error("worker count must be at least 1")]
    ZeroWorkers,
}
