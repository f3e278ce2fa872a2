use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::TransactionError;

/// A value transfer. `sender == None` marks a reward minted by mining.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub amount: i64,
    #[serde(
        default,
        with = "signature_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub signature: Option<Vec<u8>>,
}

/// Fixed-schema view used for both block hashing and signing.
/// Field order is part of the format.
#[derive(Serialize)]
pub(crate) struct CanonicalTransaction<'a> {
    sender: Option<&'a str>,
    receiver: Option<&'a str>,
    amount: i64,
}

impl Transaction {
    /// Builds an unsigned transaction. Nothing is validated here; the ledger
    /// checks admission rules when the transaction is submitted.
    pub fn new(sender: Option<String>, receiver: Option<String>, amount: i64) -> Self {
        Self {
            sender,
            receiver,
            amount,
            signature: None,
        }
    }

    pub fn transfer(sender: impl Into<String>, receiver: impl Into<String>, amount: i64) -> Self {
        Self::new(Some(sender.into()), Some(receiver.into()), amount)
    }

    pub fn reward(receiver: impl Into<String>, amount: i64) -> Self {
        Self::new(None, Some(receiver.into()), amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender.is_none()
    }

    pub(crate) fn canonical(&self) -> CanonicalTransaction<'_> {
        CanonicalTransaction {
            sender: self.sender.as_deref(),
            receiver: self.receiver.as_deref(),
            amount: self.amount,
        }
    }

    /// Compact JSON `{"sender":..,"receiver":..,"amount":..}` with `null` for
    /// absent parties. The signature is never part of it.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.canonical()).expect("canonical transaction serializes to JSON")
    }

    /// Signs the canonical bytes with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign(&mut self, private_key: &RsaPrivateKey) -> Result<(), TransactionError> {
        if self.is_reward() {
            return Err(TransactionError::SigningNotAllowed);
        }
        let signing_key = SigningKey::<Sha256>::new(private_key.clone());
        let signature = signing_key
            .try_sign(&self.canonical_bytes())
            .map_err(|e| TransactionError::Signing(e.to_string()))?;
        self.signature = Some(signature.to_vec());
        Ok(())
    }

    /// Rewards always verify. Otherwise a signature must be present; a
    /// signature that fails to parse is reported as `Ok(false)`.
    pub fn verify(&self, public_key: &RsaPublicKey) -> Result<bool, TransactionError> {
        if self.is_reward() {
            return Ok(true);
        }
        let bytes = self
            .signature
            .as_deref()
            .ok_or(TransactionError::MissingSignature)?;
        let Ok(signature) = Signature::try_from(bytes) else {
            return Ok(false);
        };
        let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
        Ok(verifying_key
            .verify(&self.canonical_bytes(), &signature)
            .is_ok())
    }
}

mod signature_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match sig {
            Some(bytes) => s.serialize_some(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn keys() -> &'static (RsaPrivateKey, RsaPrivateKey) {
        static KEYS: OnceLock<(RsaPrivateKey, RsaPrivateKey)> = OnceLock::new();
        KEYS.get_or_init(|| {
            let mut rng = rand::thread_rng();
            (
                RsaPrivateKey::new(&mut rng, 2048).unwrap(),
                RsaPrivateKey::new(&mut rng, 2048).unwrap(),
            )
        })
    }

    #[test]
    fn new_transaction_is_unsigned() {
        let tx = Transaction::transfer("Alice", "Bob", 50);
        assert_eq!(tx.sender.as_deref(), Some("Alice"));
        assert_eq!(tx.receiver.as_deref(), Some("Bob"));
        assert_eq!(tx.amount, 50);
        assert!(tx.signature.is_none());
    }

    #[test]
    fn canonical_bytes_example() {
        let tx = Transaction::transfer("Alice", "Bob", 50);
        assert_eq!(
            String::from_utf8(tx.canonical_bytes()).unwrap(),
            r#"{"sender":"Alice","receiver":"Bob","amount":50}"#
        );
    }

    #[test]
    fn canonical_bytes_encode_missing_parties_as_null() {
        let reward = Transaction::reward("Miner1", 100);
        assert_eq!(
            String::from_utf8(reward.canonical_bytes()).unwrap(),
            r#"{"sender":null,"receiver":"Miner1","amount":100}"#
        );
        let orphan = Transaction::new(Some("Alice".into()), None, 5);
        assert_eq!(
            String::from_utf8(orphan.canonical_bytes()).unwrap(),
            r#"{"sender":"Alice","receiver":null,"amount":5}"#
        );
    }

    #[test]
    fn canonical_bytes_ignore_signature_and_are_stable() {
        let (alice, _) = keys();
        let mut tx = Transaction::transfer("Alice", "Bob", 50);
        let before = tx.canonical_bytes();
        assert_eq!(before, tx.canonical_bytes());
        tx.sign(alice).unwrap();
        assert_eq!(before, tx.canonical_bytes());
    }

    #[test]
    fn sign_and_verify_with_paired_key() {
        let (alice, _) = keys();
        let mut tx = Transaction::transfer("Alice", "Bob", 50);
        tx.sign(alice).unwrap();
        assert!(tx.signature.is_some());
        assert!(tx.verify(&alice.to_public_key()).unwrap());
    }

    #[test]
    fn verify_with_unrelated_key_fails() {
        let (alice, mallory) = keys();
        let mut tx = Transaction::transfer("Alice", "Bob", 50);
        tx.sign(alice).unwrap();
        assert!(!tx.verify(&mallory.to_public_key()).unwrap());
    }

    #[test]
    fn edited_amount_invalidates_signature() {
        let (alice, _) = keys();
        let mut tx = Transaction::transfer("Alice", "Bob", 50);
        tx.sign(alice).unwrap();
        tx.amount = 5_000;
        assert!(!tx.verify(&alice.to_public_key()).unwrap());
    }

    #[test]
    fn garbage_signature_does_not_verify() {
        let (alice, _) = keys();
        let mut tx = Transaction::transfer("Alice", "Bob", 50);
        tx.signature = Some(vec![1, 2, 3]);
        assert!(!tx.verify(&alice.to_public_key()).unwrap());
    }

    #[test]
    fn unsigned_transfer_reports_missing_signature() {
        let (alice, _) = keys();
        let tx = Transaction::transfer("Alice", "Bob", 50);
        assert!(matches!(
            tx.verify(&alice.to_public_key()),
            Err(TransactionError::MissingSignature)
        ));
    }

    #[test]
    fn reward_is_exempt_from_signatures() {
        let (alice, _) = keys();
        let mut reward = Transaction::reward("Bob", 100);
        assert!(reward.verify(&alice.to_public_key()).unwrap());
        assert!(matches!(
            reward.sign(alice),
            Err(TransactionError::SigningNotAllowed)
        ));
        assert!(reward.signature.is_none());
    }

    #[test]
    fn serialization_renders_signature_as_hex() {
        let mut tx = Transaction::transfer("Alice", "Bob", 10);
        assert_eq!(
            serde_json::to_string(&tx).unwrap(),
            r#"{"sender":"Alice","receiver":"Bob","amount":10}"#
        );
        tx.signature = Some(vec![0xde, 0xad]);
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(
            json,
            r#"{"sender":"Alice","receiver":"Bob","amount":10,"signature":"dead"}"#
        );
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn transaction_inequality_different_amount() {
        let tx1 = Transaction::transfer("Alice", "Bob", 10);
        let tx2 = Transaction::transfer("Alice", "Bob", 20);
        assert_ne!(tx1, tx2);
    }
}
