//! Single-writer proof-of-work ledger: transactions signed with RSA wallets,
//! SHA-256 sealed blocks, and balances replayed from the chain.

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;
pub mod pow;
pub mod transaction;
pub mod wallet;

/// Raw SHA-256 digest. Blocks store its lowercase hex rendering.
pub type Hash = [u8; 32];

pub use block::Block;
pub use chain::Ledger;
pub use config::LedgerConfig;
pub use error::{ChainViolation, ConfigError, LedgerError, MiningError, TransactionError, WalletError};
pub use mine::CancelToken;
pub use transaction::Transaction;
pub use wallet::{derive_address, Wallet};
