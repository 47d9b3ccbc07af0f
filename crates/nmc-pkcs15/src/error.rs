use nmc_crypto::EnvelopeError;
use thiserror::Error;

/// Errors that can occur while reading PEM input or building NMC bundles.
#[derive(Debug, Error)]
pub enum Pkcs15Error {
    /// The input is not valid PEM.
    #[error("failed to decode pem {0}")]
    InvalidPem(String),
    /// The input holds no block of the kind required.
    #[error("no pem block found in {0}")]
    MissingPemBlock(&'static str),
    /// A block has a label that cannot be used in its position.
    #[error("unsupported pem block type {0:?}")]
    UnsupportedPemBlock(String),

    /// The key block could not be decoded.
    #[error("failed to parse private key: {0}")]
    InvalidKey(String),
    /// The key decoded but is of a type or size the cards cannot use.
    #[error("unsupported key type: {0}")]
    UnsupportedKey(String),
    /// The certificate block could not be decoded.
    #[error("failed to parse certificate: {0}")]
    InvalidCertificate(String),
    #[error("certificate public key does not match the private key")]
    #[allow(missing_docs)]
    KeyCertMismatch,

    /// A string does not fit its fixed-size header field.
    #[error("{field} is {actual} bytes but the header only has room for {max}")]
    HeaderOverflow {
        #[allow(missing_docs)]
        field: &'static str,
        #[allow(missing_docs)]
        max: usize,
        #[allow(missing_docs)]
        actual: usize,
    },

    /// Sealing the private key failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}
