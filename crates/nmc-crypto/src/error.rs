use thiserror::Error;

/// Errors raised while sealing or opening an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// An input had the wrong size. Rejected before any cryptographic work.
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Name of the offending input.
        field: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// The decrypted length prefix is not a 3DES key length. The KEK (and so the password) is
    /// wrong or the ciphertext is corrupted.
    #[error("unwrapped CEK length is {0} but 3DES requires 16 or 24 (wrong password or corrupted data)")]
    CekLengthMismatch(u8),
    /// The check value does not match the complement of the CEK.
    #[error("CEK check value did not match CEK")]
    CheckValueMismatch,
    /// The MAC over the encrypted content does not verify.
    #[error("envelope MAC did not match encrypted content")]
    MacMismatch,
    /// Decrypted content carries invalid block padding.
    #[error("encrypted content has invalid padding")]
    InvalidPadding,

    /// Key derivation or MAC key setup rejected its input.
    #[error("key derivation failed")]
    Kdf,
    /// The block cipher rejected a key, IV or input length.
    #[error("cipher error: {0}")]
    Cipher(String),
}

impl EnvelopeError {
    /// True for failures detected after decryption, meaning the wrong password was used or
    /// the data was tampered with. False for malformed input and internal errors.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            EnvelopeError::CekLengthMismatch(_)
                | EnvelopeError::CheckValueMismatch
                | EnvelopeError::MacMismatch
                | EnvelopeError::InvalidPadding
        )
    }
}
