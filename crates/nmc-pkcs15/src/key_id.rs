//! Alternate key identifiers used to cross-reference the key and certificate objects.
//!
//! Each identifier is encoded as `SEQUENCE { INTEGER kind, OCTET STRING value }`. Kinds 8 and 9
//! are derived from the RSA public key and do not exist for EC keys.

use chrono::{DateTime, Utc};
use nmc_der::{integer, integer_from_u64, octet_string, sequence};
use num_bigint::BigUint;
use sha1::{Digest, Sha1};

use crate::{certificate::Certificate, key::PrivateKey};

const OPENPGP_V4: u8 = 4;
const OPENPGP_RSA: u8 = 1;
const OPENPGP_PUBLIC_KEY_TAG: u8 = 0x99;

fn tagged(kind: u64, value: &[u8]) -> Vec<u8> {
    sequence([integer_from_u64(kind), octet_string(value)])
}

/// SHA-1 of the certificate's SubjectPublicKeyInfo. Identifies both objects in the bundle.
pub fn base_key_id(cert: &Certificate) -> [u8; 20] {
    Sha1::digest(cert.raw_subject_public_key_info()).into()
}

/// Subject key identifier.
///
/// Holds [`base_key_id`] instead of the certificate's SKI extension; firmware expects this.
pub fn key_id_2(cert: &Certificate) -> Vec<u8> {
    tagged(2, &base_key_id(cert))
}

/// SHA-1 of `IssuerAndSerialNumber`.
pub fn key_id_3(cert: &Certificate) -> Vec<u8> {
    let issuer_and_serial = sequence([cert.raw_issuer().to_vec(), integer(cert.serial())]);
    tagged(3, &Sha1::digest(issuer_and_serial))
}

/// SHA-1 of the issuer name.
pub fn key_id_6(cert: &Certificate) -> Vec<u8> {
    tagged(6, &Sha1::digest(cert.raw_issuer()))
}

/// SHA-1 of the subject name.
pub fn key_id_7(cert: &Certificate) -> Vec<u8> {
    tagged(7, &Sha1::digest(cert.raw_subject()))
}

/// PGP v3 key id: the low 8 bytes of the modulus.
pub fn key_id_8(key: &PrivateKey) -> Option<Vec<u8>> {
    match key {
        PrivateKey::Rsa(rsa) => {
            let n = rsa.n.to_bytes_be();
            Some(tagged(8, &n[n.len().saturating_sub(8)..]))
        }
        PrivateKey::Ec(_) => None,
    }
}

/// OpenPGP v4 key id: the low 8 bytes of the v4 fingerprint.
///
/// The key file carries no creation time, so the certificate's NotBefore stands in for it.
pub fn key_id_9(key: &PrivateKey, cert: &Certificate) -> Option<Vec<u8>> {
    let PrivateKey::Rsa(rsa) = key else {
        return None;
    };

    let created = v4_timestamp(cert.not_before());

    let mut packet = vec![OPENPGP_V4];
    packet.extend_from_slice(&created.to_be_bytes());
    packet.push(OPENPGP_RSA);
    packet.extend_from_slice(&mpi(&rsa.n));
    packet.extend_from_slice(&mpi(&rsa.e));

    let mut hasher = Sha1::new();
    hasher.update([OPENPGP_PUBLIC_KEY_TAG]);
    hasher.update((packet.len() as u16).to_be_bytes());
    hasher.update(&packet);
    let fingerprint = hasher.finalize();

    Some(tagged(9, &fingerprint[fingerprint.len() - 8..]))
}

/// Seconds since the epoch as a v4 packet stores them, clamped to the 32-bit range.
fn v4_timestamp(time: DateTime<Utc>) -> u32 {
    let seconds = time.timestamp();
    u32::try_from(seconds).unwrap_or(if seconds < 0 { 0 } else { u32::MAX })
}

/// OpenPGP multiprecision integer: big-endian bit count followed by the magnitude.
fn mpi(value: &BigUint) -> Vec<u8> {
    let mut out = (value.bits() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(&value.to_bytes_be());
    out
}
