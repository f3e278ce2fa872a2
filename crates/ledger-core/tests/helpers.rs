#![allow(dead_code)]

use ledger_core::{Ledger, LedgerConfig, Wallet};
use std::path::PathBuf;
use std::sync::OnceLock;
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

/// Key file path inside a fresh temp dir. Keep the `TempDir` alive while the
/// path is in use.
pub fn temp_key_file() -> (TempDir, PathBuf) {
    let (temp_dir, dir) = create_temp_dir();
    (temp_dir, dir.join("wallet.json"))
}

/// Ledger cheap enough to mine repeatedly in tests.
pub fn fast_ledger() -> Ledger {
    Ledger::with_config(LedgerConfig {
        difficulty: 2,
        ..Default::default()
    })
    .expect("valid test config")
}

/// RSA generation dominates test time, so each binary shares two wallets.
pub fn shared_wallets() -> &'static (Wallet, Wallet) {
    static WALLETS: OnceLock<(Wallet, Wallet)> = OnceLock::new();
    WALLETS.get_or_init(|| {
        (
            Wallet::generate().expect("generate wallet"),
            Wallet::generate().expect("generate wallet"),
        )
    })
}
