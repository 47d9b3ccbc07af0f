use std::cell::OnceCell;

use nmc_crypto::{DeviceProfile, Envelope};
use rand::{CryptoRng, RngCore};

use crate::{
    certificate::{Certificate, CertificatePublicKey},
    error::Pkcs15Error,
    key::{KeyType, PrivateKey},
    pem::{decode_certificate, decode_private_key},
};

/// A private key and the certificate issued for it.
///
/// The pair is verified once, at construction. The sealed private key envelope is computed on
/// first use and then shared by every bundle built from this pair, so all outputs embed the same
/// ciphertext.
#[derive(Debug)]
pub struct KeyCertPair {
    key: PrivateKey,
    cert: Certificate,
    profile: DeviceProfile,
    envelope: OnceCell<Envelope>,
}

impl KeyCertPair {
    /// Pair a key with its certificate, failing if the certificate was issued for another key.
    pub fn new(key: PrivateKey, cert: Certificate) -> Result<Self, Pkcs15Error> {
        if !public_key_matches(&key, &cert) {
            return Err(Pkcs15Error::KeyCertMismatch);
        }
        Ok(KeyCertPair {
            key,
            cert,
            profile: DeviceProfile::apc(),
            envelope: OnceCell::new(),
        })
    }

    /// Decode and pair a PEM key and PEM certificate.
    pub fn from_pem(key_pem: &[u8], cert_pem: &[u8]) -> Result<Self, Pkcs15Error> {
        let key = decode_private_key(key_pem)?;
        let cert = decode_certificate(cert_pem)?;
        tracing::debug!(key_type = %key.key_type(), "decoded key and certificate");
        Self::new(key, cert)
    }

    /// Seal the key for a different device profile.
    pub fn with_profile(self, profile: DeviceProfile) -> Self {
        KeyCertPair {
            profile,
            envelope: OnceCell::new(),
            ..self
        }
    }

    #[allow(missing_docs)]
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    #[allow(missing_docs)]
    pub fn cert(&self) -> &Certificate {
        &self.cert
    }

    #[allow(missing_docs)]
    pub fn key_type(&self) -> KeyType {
        self.key.key_type()
    }

    /// The sealed private key, created from `rng` on the first call.
    pub fn envelope<R>(&self, rng: &mut R) -> Result<&Envelope, Pkcs15Error>
    where
        R: RngCore + CryptoRng,
    {
        if let Some(envelope) = self.envelope.get() {
            return Ok(envelope);
        }
        let envelope = Envelope::seal(&self.key.plaintext_object(), &self.profile, rng)?;
        Ok(self.envelope.get_or_init(|| envelope))
    }
}

fn public_key_matches(key: &PrivateKey, cert: &Certificate) -> bool {
    match (key, &cert.public_key) {
        (PrivateKey::Rsa(rsa), CertificatePublicKey::Rsa { n, e }) => rsa.n == *n && rsa.e == *e,
        (PrivateKey::Ec(ec), CertificatePublicKey::Ec { curve, point }) => {
            *curve == Some(ec.curve.oid()) && ec.public_point == *point
        }
        _ => false,
    }
}
