//! Cryptographic primitives for encoded string table records
//!
//! Encoded string references optionally carry a 64-bit key. Records looked up
//! with such a reference are stored RC4-encrypted; the RC4 key is produced from
//! the reference key by a fixed mixing function.
//!
//! # Components
//!
//! - **Key derivation**: [`kdf::derive_cipher_key`] expands a `u64` into the
//!   20-byte RC4 key
//! - **Encryption**: [`arc4::Arc4Cipher`] is a plain RC4 implementation
//! - **Record cipher**: [`RecordCipher`] ties the two together per reference key
//!
//! # Example
//!
//! ```
//! use encstr_crypto::RecordCipher;
//!
//! # fn main() -> Result<(), encstr_crypto::CryptoError> {
//! let cipher = RecordCipher::new(0x0C64_1949_DE77)?;
//! let mut payload = vec![0x12, 0x34, 0x56];
//! cipher.apply(&mut payload)?;
//! cipher.apply(&mut payload)?;
//! assert_eq!(payload, [0x12, 0x34, 0x56]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod arc4;
pub mod error;
pub mod kdf;

pub use error::{CryptoError, Result};

// Re-export commonly used types
pub use arc4::Arc4Cipher;
pub use kdf::{DERIVED_KEY_LEN, DerivedKey, RecordCipher, derive_cipher_key};
