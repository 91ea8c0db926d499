//! ARC4 (RC4-compatible) stream cipher used for encrypted string records.
//!
//! Encrypted table records are protected by plain RC4 keyed with the 20-byte
//! output of [`crate::kdf::derive_cipher_key`]. Encryption and decryption are
//! the same XOR operation, so a fresh cipher is needed for each record.
//!
//! ```rust
//! use encstr_crypto::arc4::Arc4Cipher;
//!
//! # fn main() -> Result<(), encstr_crypto::CryptoError> {
//! let mut payload = b"record payload".to_vec();
//! Arc4Cipher::new(b"Key")?.apply_keystream(&mut payload);
//! Arc4Cipher::new(b"Key")?.apply_keystream(&mut payload);
//! assert_eq!(payload, b"record payload");
//! # Ok(())
//! # }
//! ```

use crate::error::{CryptoError, Result};

/// ARC4 cipher state: the permutation and the two PRGA indices.
#[derive(Clone)]
pub struct Arc4Cipher {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl std::fmt::Debug for Arc4Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keystream state is key material
        f.debug_struct("Arc4Cipher").finish_non_exhaustive()
    }
}

impl Arc4Cipher {
    /// Run the key schedule for `key`.
    ///
    /// The key is addressed cyclically, so any length from 1 to 256 bytes
    /// produces the standard RC4 permutation.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for an empty key or one
    /// longer than 256 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() || key.len() > 256 {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }

        let mut s = [0u8; 256];
        for (slot, value) in s.iter_mut().zip(0u8..=255) {
            *slot = value;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Ok(Self { s, i: 0, j: 0 })
    }

    fn next_keystream_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);

        let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[k as usize]
    }

    /// XOR the keystream into `data` in place.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte ^= self.next_keystream_byte();
        }
    }

    /// Return a decrypted copy of `data`.
    pub fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply_keystream(&mut out);
        out
    }
}

/// One-shot RC4 over `data` with a freshly scheduled `key`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyLength`] if `key` is not 1-256 bytes.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    Ok(Arc4Cipher::new(key)?.decrypt(data))
}
