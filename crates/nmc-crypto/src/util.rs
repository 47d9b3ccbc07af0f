use std::num::NonZeroU32;

use hmac::digest::{FixedOutput, KeyInit, Update};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::error::EnvelopeError;

pub(crate) type PbkdfSha256Hmac = hmac::Hmac<sha2::Sha256>;
pub(crate) type PbkdfSha1Hmac = hmac::Hmac<sha1::Sha1>;

/// Fill an array with bytes from the supplied generator.
pub fn generate_random_bytes<const N: usize, R>(rng: &mut R) -> [u8; N]
where
    R: RngCore + CryptoRng,
{
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

fn pbkdf2<Prf, const N: usize>(
    password: &[u8],
    salt: &[u8],
    rounds: u32,
) -> Result<Zeroizing<[u8; N]>, EnvelopeError>
where
    Prf: KeyInit + Update + FixedOutput + Clone + Sync,
{
    pbkdf2::pbkdf2_array::<Prf, N>(password, salt, rounds)
        .map(Zeroizing::new)
        .map_err(|_| EnvelopeError::Kdf)
}

pub(crate) fn pbkdf2_sha256<const N: usize>(
    password: &[u8],
    salt: &[u8],
    rounds: NonZeroU32,
) -> Result<Zeroizing<[u8; N]>, EnvelopeError> {
    pbkdf2::<PbkdfSha256Hmac, N>(password, salt, rounds.get())
}

/// Single-round PBKDF2-SHA1, used to split the CEK into its encryption and MAC keys.
pub(crate) fn pbkdf2_sha1_once<const N: usize>(
    password: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<[u8; N]>, EnvelopeError> {
    pbkdf2::<PbkdfSha1Hmac, N>(password, salt, 1)
}

pub(crate) fn bitwise_complement(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| !b).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_generate_random_bytes_is_seed_deterministic() {
        let a: [u8; 16] = generate_random_bytes(&mut rand_chacha::ChaCha8Rng::seed_from_u64(3));
        let b: [u8; 16] = generate_random_bytes(&mut rand_chacha::ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
        assert_ne!(a, [0u8; 16]);
    }

    #[test]
    fn test_pbkdf2_sha1_single_round() {
        // RFC 6070 test vector 1
        let key = pbkdf2_sha1_once::<20>(b"password", b"salt").unwrap();
        assert_eq!(hex::encode(*key), "0c60c80f961f0e71f3a9b524af6012062fe037a6");
    }

    #[test]
    fn test_complement() {
        assert_eq!(bitwise_complement(&[0x00, 0x0f, 0xff]), vec![0xff, 0xf0, 0x00]);
    }
}
