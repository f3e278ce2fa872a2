use sha2::{Digest, Sha256};

use crate::Hash;

/// SHA-256 of a block preimage whose only varying part is the nonce.
/// `prefix` is everything up to and including `"nonce":`.
pub fn digest_with_nonce(prefix: &[u8], nonce: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(b"}");
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Number of leading `'0'` characters in a hex-rendered hash.
pub fn leading_zero_hex_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

/// True when the hex hash starts with `difficulty` zero characters.
pub fn meets_target(hash: &str, difficulty: usize) -> bool {
    leading_zero_hex_digits(hash) >= difficulty
}

/// Same test as [`meets_target`] on the raw digest: each hex character
/// covers four bits.
pub fn digest_meets_target(hash: &Hash, difficulty: usize) -> bool {
    count_leading_zero_bits(hash) as usize >= difficulty.saturating_mul(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80; // 00000000 10000000
        assert_eq!(count_leading_zero_bits(&h), 8);
        h[1] = 0x40; // 01000000
        assert_eq!(count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn hex_target_examples() {
        assert!(meets_target("0000ab", 4));
        assert!(meets_target("0000ab", 3));
        assert!(!meets_target("000ab0", 4));
        assert!(meets_target("abcd", 0));
        assert!(!meets_target("00", 3));
    }

    #[test]
    fn digest_and_hex_targets_agree() {
        for first in [0x00u8, 0x01, 0x0f, 0x10, 0xff] {
            let mut h = [0xffu8; 32];
            h[0] = 0;
            h[1] = first;
            let hex = hex::encode(h);
            for difficulty in 0..6 {
                assert_eq!(
                    digest_meets_target(&h, difficulty),
                    meets_target(&hex, difficulty),
                    "byte {first:#04x}, difficulty {difficulty}"
                );
            }
        }
    }

    #[test]
    fn digest_with_nonce_appends_nonce_and_brace() {
        let prefix = br#"{"index":0,"nonce":"#;
        let mut hasher = Sha256::new();
        hasher.update(br#"{"index":0,"nonce":42}"#);
        let expected = hasher.finalize();
        assert_eq!(digest_with_nonce(prefix, 42)[..], expected[..]);
    }
}
