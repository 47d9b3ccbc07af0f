use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};

use crate::SshError;

/// Checks a server host key blob against a pinned SHA-256 fingerprint.
///
/// `expected` may be base64 without padding (the OpenSSH `SHA256:` form without its prefix) or
/// hex. On mismatch the error carries both encodings of the observed key and its MD5 form, which
/// is what the card's web UI displays.
pub fn verify_host_key(host_key: &[u8], expected: &str) -> Result<(), SshError> {
    let digest = Sha256::digest(host_key);
    let sha256_b64 = STANDARD_NO_PAD.encode(digest);
    let sha256_hex = hex::encode(digest);

    if sha256_b64 == expected || sha256_hex.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    Err(SshError::FingerprintMismatch {
        sha256_b64,
        sha256_hex,
        md5_hint: md5_colon_hex(host_key),
    })
}

fn md5_colon_hex(host_key: &[u8]) -> String {
    md5::compute(host_key)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
