//! Raw 3DES-EDE3 in CBC mode.
//!
//! The key wrap operates on whole blocks without padding, while the content encryption uses
//! PKCS#7. Both are thin wrappers over the RustCrypto `cbc` and `des` crates.

use cbc::cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    block_padding::{NoPadding, Pkcs7},
};

use crate::{SALT_SIZE, error::EnvelopeError};

type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;

pub(crate) const BLOCK_SIZE: usize = SALT_SIZE;

fn cipher_error(err: impl std::fmt::Display) -> EnvelopeError {
    EnvelopeError::Cipher(err.to_string())
}

/// Encrypt whole blocks. `data` must be a multiple of the block size.
pub(crate) fn encrypt_blocks(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(EnvelopeError::Cipher(format!(
            "{} bytes is not a whole number of blocks",
            data.len()
        )));
    }
    let enc = TdesCbcEnc::new_from_slices(key, iv).map_err(cipher_error)?;
    Ok(enc.encrypt_padded_vec_mut::<NoPadding>(data))
}

/// Decrypt whole blocks. `data` must be a multiple of the block size.
pub(crate) fn decrypt_blocks(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let dec = TdesCbcDec::new_from_slices(key, iv).map_err(cipher_error)?;
    dec.decrypt_padded_vec_mut::<NoPadding>(data).map_err(|_| {
        EnvelopeError::Cipher(format!(
            "{} bytes is not a whole number of blocks",
            data.len()
        ))
    })
}

/// PKCS#7 pad and encrypt. Always appends at least one byte of padding.
pub(crate) fn encrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let enc = TdesCbcEnc::new_from_slices(key, iv).map_err(cipher_error)?;
    Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(data))
}

/// Decrypt and strip PKCS#7 padding.
pub(crate) fn decrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let dec = TdesCbcDec::new_from_slices(key, iv).map_err(cipher_error)?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| EnvelopeError::InvalidPadding)
}
