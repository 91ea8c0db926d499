//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key size for the RC4 key schedule
    #[error("Invalid key length: {0} (must be 1-256 bytes)")]
    InvalidKeyLength(usize),

    /// A record cipher was requested for key 0, which marks plaintext records
    #[error("Cipher key 0 marks a plaintext record")]
    PlaintextKey,
}

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
