//! Password recipient key wrap for the CEK.
//!
//! The wrapped CEK is formatted as `len || check || cek || padding`, where `check` is the
//! bitwise complement of the first three CEK bytes and the padding brings the total to a
//! multiple of the block size, and at least two blocks. It is then encrypted twice with
//! 3DES-CBC under the KEK. The first pass starts from the wrap salt; the second pass continues
//! the CBC chain, taking the last ciphertext block of the first pass as its IV.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    CEK_SIZE, ENCRYPTED_CEK_SIZE, KEK_SIZE, SALT_SIZE, ensure, ensure_len,
    error::EnvelopeError,
    tdes::{self, BLOCK_SIZE},
    util::bitwise_complement,
};

const CHECK_SIZE: usize = 3;

/// Lay out the CEK for encryption, drawing the padding bytes from `rng`.
pub fn format_wrapped_cek<R>(cek: &[u8], rng: &mut R) -> Result<Zeroizing<Vec<u8>>, EnvelopeError>
where
    R: RngCore + CryptoRng,
{
    ensure_len!(cek, CEK_SIZE, "cek");

    let unpadded = 1 + CHECK_SIZE + cek.len();
    let total = unpadded.max(2 * BLOCK_SIZE).next_multiple_of(BLOCK_SIZE);

    let mut wrapped = Zeroizing::new(Vec::with_capacity(total));
    wrapped.push(cek.len() as u8);
    wrapped.extend_from_slice(&bitwise_complement(&cek[..CHECK_SIZE]));
    wrapped.extend_from_slice(cek);

    let mut padding = vec![0u8; total - unpadded];
    rng.fill_bytes(&mut padding);
    wrapped.extend_from_slice(&padding);

    Ok(wrapped)
}

/// Encrypt an already formatted CEK with the two chained CBC passes.
pub fn encrypt_wrapped_cek(
    wrapped: &[u8],
    kek: &[u8],
    salt: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    ensure_len!(kek, KEK_SIZE, "kek");
    ensure_len!(salt, SALT_SIZE, "cek wrap salt");

    let first = tdes::encrypt_blocks(kek, salt, wrapped)?;
    let chained_iv = &first[first.len() - BLOCK_SIZE..];
    tdes::encrypt_blocks(kek, chained_iv, &first)
}

/// Format and encrypt a CEK under the KEK.
pub fn wrap_cek<R>(
    cek: &[u8],
    kek: &[u8],
    salt: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, EnvelopeError>
where
    R: RngCore + CryptoRng,
{
    ensure_len!(kek, KEK_SIZE, "kek");
    ensure_len!(salt, SALT_SIZE, "cek wrap salt");

    let wrapped = format_wrapped_cek(cek, rng)?;
    encrypt_wrapped_cek(&wrapped, kek, salt)
}

/// Recover the CEK from its encrypted form.
///
/// All lengths are checked before decrypting. A wrong KEK surfaces as
/// [`EnvelopeError::CekLengthMismatch`] or [`EnvelopeError::CheckValueMismatch`].
pub fn unwrap_cek(
    encrypted_cek: &[u8],
    salt: &[u8],
    kek: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    ensure_len!(encrypted_cek, ENCRYPTED_CEK_SIZE, "encrypted cek");
    ensure_len!(salt, SALT_SIZE, "cek wrap salt");
    ensure_len!(kek, KEK_SIZE, "kek");

    let n = encrypted_cek.len();
    let (head, last) = encrypted_cek.split_at(n - BLOCK_SIZE);

    // Undo the second pass. Its IV was the last block of the first pass, which is recovered by
    // decrypting the final block against the one before it.
    let last_plain = tdes::decrypt_blocks(kek, &head[head.len() - BLOCK_SIZE..], last)?;
    let mut first_pass = tdes::decrypt_blocks(kek, &last_plain, head)?;
    first_pass.extend_from_slice(&last_plain);

    let wrapped = Zeroizing::new(tdes::decrypt_blocks(kek, salt, &first_pass)?);

    let len = wrapped[0];
    ensure!(len == 16 || len == 24 => EnvelopeError::CekLengthMismatch(len));
    let len = usize::from(len);
    ensure!(1 + CHECK_SIZE + len <= wrapped.len() => EnvelopeError::CekLengthMismatch(wrapped[0]));

    let cek = &wrapped[1 + CHECK_SIZE..1 + CHECK_SIZE + len];
    ensure!(
        wrapped[1..1 + CHECK_SIZE] == bitwise_complement(&cek[..CHECK_SIZE])[..]
            => EnvelopeError::CheckValueMismatch
    );

    Ok(Zeroizing::new(cek.to_vec()))
}
