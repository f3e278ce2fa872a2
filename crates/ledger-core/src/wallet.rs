use ripemd::Ripemd160;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use crate::error::{TransactionError, WalletError};
use crate::transaction::Transaction;

/// An RSA keypair and the address derived from its public half.
///
/// `RsaPrivateKey` zeroizes its limbs on drop, so the secret does not outlive
/// the wallet.
#[derive(Clone)]
pub struct Wallet {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    address: String,
}

/// On-disk layout of an encrypted wallet.
#[derive(Serialize, Deserialize)]
struct KeyFile {
    /// Hex of a PKCS#8 `EncryptedPrivateKeyInfo` (PBES2, AES-256-CBC).
    private_key: String,
    /// SPKI PEM.
    public_key: String,
    address: String,
}

/// `hex(RIPEMD160(SHA256(der)))` where `der` is the SubjectPublicKeyInfo DER
/// encoding of the key.
pub fn derive_address(public_key: &RsaPublicKey) -> Result<String, WalletError> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| WalletError::KeyEncoding(e.to_string()))?;
    let sha = Sha256::digest(der.as_bytes());
    Ok(hex::encode(Ripemd160::digest(sha)))
}

impl Wallet {
    pub fn generate() -> Result<Self, WalletError> {
        Self::generate_keypair(DEFAULT_KEY_BITS)
    }

    pub fn generate_keypair(bits: usize) -> Result<Self, WalletError> {
        if bits < MIN_KEY_BITS {
            return Err(WalletError::KeyTooSmall { bits });
        }
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| WalletError::KeyGeneration(e.to_string()))?;
        Self::from_private_key(private_key)
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> Result<Self, WalletError> {
        let public_key = private_key.to_public_key();
        let address = derive_address(&public_key)?;
        Ok(Self {
            private_key,
            public_key,
            address,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key_pem(&self) -> Result<String, WalletError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| WalletError::KeyEncoding(e.to_string()))
    }

    pub fn sign(&self, tx: &mut Transaction) -> Result<(), TransactionError> {
        tx.sign(&self.private_key)
    }

    /// A signed transfer from this wallet's address.
    pub fn transfer(
        &self,
        receiver: impl Into<String>,
        amount: i64,
    ) -> Result<Transaction, TransactionError> {
        let mut tx = Transaction::transfer(self.address.clone(), receiver, amount);
        self.sign(&mut tx)?;
        Ok(tx)
    }

    /// Writes the key file. The private key is encrypted under a key derived
    /// from `passphrase`; the public key and address are stored in the clear.
    pub fn save_encrypted(&self, path: impl AsRef<Path>, passphrase: &str) -> Result<(), WalletError> {
        let encrypted = self
            .private_key
            .to_pkcs8_encrypted_der(rand::thread_rng(), passphrase.as_bytes())
            .map_err(|e| WalletError::KeyEncoding(e.to_string()))?;
        let file = KeyFile {
            private_key: hex::encode(encrypted.as_bytes()),
            public_key: self.public_key_pem()?,
            address: self.address.clone(),
        };
        fs::write(path.as_ref(), serde_json::to_vec_pretty(&file)?)?;
        debug!("saved wallet {} to {}", self.address, path.as_ref().display());
        Ok(())
    }

    /// Reads a key file written by [`Wallet::save_encrypted`]. A wrong
    /// passphrase or damaged ciphertext yields [`WalletError::Decryption`]; the
    /// stored public key and address must agree with the decrypted key.
    pub fn load_encrypted(path: impl AsRef<Path>, passphrase: &str) -> Result<Self, WalletError> {
        let file: KeyFile = serde_json::from_slice(&fs::read(path.as_ref())?)?;
        let encrypted = hex::decode(&file.private_key)?;
        let private_key = RsaPrivateKey::from_pkcs8_encrypted_der(&encrypted, passphrase.as_bytes())
            .map_err(|_| WalletError::Decryption)?;

        let public_key = RsaPublicKey::from_public_key_pem(&file.public_key)
            .map_err(|e| WalletError::KeyEncoding(e.to_string()))?;
        if private_key.to_public_key() != public_key {
            return Err(WalletError::KeyMismatch);
        }
        let derived = derive_address(&public_key)?;
        if derived != file.address {
            return Err(WalletError::AddressMismatch {
                stored: file.address,
                derived,
            });
        }

        debug!("loaded wallet {} from {}", derived, path.as_ref().display());
        Ok(Self {
            private_key,
            public_key,
            address: derived,
        })
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
