//! Cipher key derivation for encrypted string records.
//!
//! An encoded reference carries a 64-bit key. It is expanded into the 20-byte
//! RC4 key by a single fixed mixing round over five little-endian words. The
//! round looks like one step of a SHA-1 style compression function but its
//! constants and boolean functions differ, so it must be reproduced exactly;
//! no standard hash yields the same bytes.

use crate::arc4::Arc4Cipher;
use crate::error::{CryptoError, Result};

/// Length of the derived RC4 key in bytes
pub const DERIVED_KEY_LEN: usize = 20;

/// Derived 20-byte RC4 key
pub type DerivedKey = [u8; DERIVED_KEY_LEN];

/// Expand a 64-bit reference key into the 20-byte RC4 key.
///
/// The input block is `LE64(key) ++ LE64(key) ++ LE64(key)[..4]`, read back as
/// five little-endian `u32` words. All arithmetic wraps modulo 2^32.
pub fn derive_cipher_key(key: u64) -> DerivedKey {
    let k = key.to_le_bytes();
    let lo = u32::from_le_bytes([k[0], k[1], k[2], k[3]]);
    let hi = u32::from_le_bytes([k[4], k[5], k[6], k[7]]);
    let [w0, w1, w2, w3, w4] = [lo, hi, lo, hi, lo];

    let a = w0.wrapping_add(0x9fb4_98b3);
    let b = w1
        .wrapping_add(0x66b0_cd0d)
        .wrapping_add(a.rotate_left(5));
    let a30 = a.rotate_left(30);

    let f_a = !(a & 0x2222_2222) & 0x7bf3_6ae2;
    let c = b
        .rotate_left(5)
        .wrapping_add(w2)
        .wrapping_add(f_a)
        .wrapping_add(0xf33d_5697);
    let b30 = b.rotate_left(30);

    let g = ((a30 ^ 0x59d1_48c0) & b) ^ 0x59d1_48c0;
    let d = w3
        .wrapping_add(c.rotate_left(5))
        .wrapping_add(g)
        .wrapping_add(0xd675_e47b);
    let c30 = c.rotate_left(30);

    let h = ((a30 ^ b30) & c) ^ a30;
    let e = h
        .wrapping_add(w4)
        .wrapping_add(d.rotate_left(5))
        .wrapping_add(0xb453_c259)
        .wrapping_add(w0);

    let mut out = [0u8; DERIVED_KEY_LEN];
    let words = [
        e,
        w1.wrapping_add(d),
        w2.wrapping_add(c30),
        b30.wrapping_add(w3),
        a30.wrapping_add(w4),
    ];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// RC4 cipher bound to one reference key.
///
/// Every record is decrypted from the start of its payload, so the cipher is
/// re-keyed per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCipher {
    key: u64,
    derived: DerivedKey,
}

impl RecordCipher {
    /// Build the cipher for a non-zero reference key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::PlaintextKey`] for key 0, which marks records
    /// that are stored unencrypted.
    pub fn new(key: u64) -> Result<Self> {
        if key == 0 {
            return Err(CryptoError::PlaintextKey);
        }
        Ok(Self {
            key,
            derived: derive_cipher_key(key),
        })
    }

    /// Reference key this cipher was built from
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Derived RC4 key bytes
    pub const fn derived_key(&self) -> &DerivedKey {
        &self.derived
    }

    /// Decrypt (or encrypt) a record payload in place.
    pub fn apply(&self, payload: &mut [u8]) -> Result<()> {
        Arc4Cipher::new(&self.derived)?.apply_keystream(payload);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_zero_key() {
        assert_eq!(
            derive_cipher_key(0),
            [
                0x7E, 0x58, 0x5B, 0x69, 0xFD, 0x3A, 0xED, 0xCD, 0x58, 0x4C, 0x63, 0x85, 0xE0, 0xF8,
                0x50, 0x17, 0x2C, 0x26, 0xED, 0xE7,
            ]
        );
    }

    #[test]
    fn test_derive_small_key() {
        assert_eq!(
            derive_cipher_key(1),
            [
                0x74, 0x64, 0x6B, 0xA9, 0x7D, 0xBB, 0xED, 0x8D, 0x5A, 0x4D, 0x63, 0x45, 0xE8, 0xF8,
                0x50, 0x17, 0x2E, 0x26, 0xED, 0x27,
            ]
        );
    }

    #[test]
    fn test_derive_reference_key() {
        // Key carried by tokens [0x8101, 0x47D8, 0xB358, 0xFFE1, 0x4077]
        assert_eq!(
            derive_cipher_key(0x0C64_1949_DE77),
            [
                0xB1, 0x7C, 0x3C, 0x95, 0xD2, 0xB5, 0x40, 0xC0, 0x2E, 0xF4, 0x5D, 0xA7, 0x16, 0xFC,
                0x9F, 0x21, 0x41, 0x7C, 0x89, 0xC7,
            ]
        );
    }

    #[test]
    fn test_derive_full_width_key() {
        assert_eq!(
            derive_cipher_key(0x0123_4567_89AB_CDEF),
            [
                0x66, 0xB2, 0xDB, 0x38, 0x3B, 0x07, 0x36, 0x3E, 0x0D, 0x1F, 0xE2, 0x9E, 0x15, 0x7F,
                0x1B, 0x66, 0x97, 0xE7, 0x03, 0x14,
            ]
        );
    }

    #[test]
    fn test_record_cipher_rejects_zero_key() {
        assert_eq!(RecordCipher::new(0), Err(CryptoError::PlaintextKey));
    }

    #[test]
    fn test_record_cipher_matches_manual_rc4() {
        let cipher = RecordCipher::new(0x0C64_1949_DE77).unwrap();
        assert_eq!(cipher.key(), 0x0C64_1949_DE77);

        let mut payload = b"Sunspear Scout".to_vec();
        cipher.apply(&mut payload).unwrap();

        let manual = crate::arc4::decrypt(&derive_cipher_key(0x0C64_1949_DE77), b"Sunspear Scout")
            .unwrap();
        assert_eq!(payload, manual);
    }

    proptest! {
        #[test]
        fn record_cipher_round_trips(
            key in 1u64..=u64::MAX,
            payload in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let cipher = RecordCipher::new(key).unwrap();
            let mut data = payload.clone();
            cipher.apply(&mut data).unwrap();
            cipher.apply(&mut data).unwrap();
            prop_assert_eq!(data, payload);
        }

        #[test]
        fn derivation_is_deterministic(key in any::<u64>()) {
            prop_assert_eq!(derive_cipher_key(key), derive_cipher_key(key));
        }
    }
}
