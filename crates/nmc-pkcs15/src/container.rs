//! PKCS#15 bundle layouts.
//!
//! All three layouts share the outer `ContentInfo { pkcs15content, [0] { SEQUENCE { INTEGER 0,
//! SEQUENCE { objects } } } }` and differ in the object directories they carry. Usage bits,
//! access flags and the selection of key ids are what the firmware compares against, not what
//! PKCS#15 mandates.

use nmc_der::{
    bit_string, explicit_compound, generalized_time, generalized_time_explicit_value, integer,
    integer_from_u64, null, object_identifier, octet_string, oid, sequence, utf8_string,
};
use rand::{CryptoRng, RngCore};

use crate::{
    error::Pkcs15Error,
    key::PrivateKey,
    key_id::{base_key_id, key_id_2, key_id_3, key_id_6, key_id_7, key_id_8, key_id_9},
    pair::KeyCertPair,
};

/// Label the firmware gives every object it writes.
pub const KEY_LABEL: &str = "Private key";

const RSA_PRIVATE_USAGE: u8 = 0b1110_0010;
const EC_PRIVATE_USAGE: u8 = 0b0010_0010;
const PRIVATE_ACCESS_FLAGS: u8 = 0b1011_0000;
const RSA_PUBLIC_USAGE: u8 = 0b1000_0010;
const EC_PUBLIC_USAGE: u8 = 0b0000_0010;
const PUBLIC_ACCESS_FLAGS: u8 = 0b0100_0000;

// Object directory tags inside Pkcs15Objects.
const PRIVATE_KEYS: u8 = 0;
const PUBLIC_KEYS: u8 = 1;
const CERTIFICATES: u8 = 4;

fn content_info<I>(directories: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    sequence([
        object_identifier(&oid::PKCS15_CONTENT),
        explicit_compound(0, [sequence([integer_from_u64(0), sequence(directories)])]),
    ])
}

/// `[tag] { [0] { object } }`
fn directory(tag: u8, object: Vec<u8>) -> Vec<u8> {
    explicit_compound(tag, [explicit_compound(0, [object])])
}

fn label() -> Vec<u8> {
    sequence([utf8_string(KEY_LABEL)])
}

/// `[1] { SEQUENCE { [4] { envelope } } }`, the indirect-protected object value.
fn enveloped_value(envelope: &[u8]) -> Vec<u8> {
    explicit_compound(1, [sequence([explicit_compound(4, [envelope])])])
}

/// RSA objects are SEQUENCEs, EC objects are `[0]` tagged choices.
fn key_object<I>(key: &PrivateKey, children: I) -> Vec<u8>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    match key {
        PrivateKey::Rsa(_) => sequence(children),
        PrivateKey::Ec(_) => explicit_compound(0, children),
    }
}

fn private_usage(key: &PrivateKey) -> u8 {
    match key {
        PrivateKey::Rsa(_) => RSA_PRIVATE_USAGE,
        PrivateKey::Ec(_) => EC_PRIVATE_USAGE,
    }
}

fn public_key_object(pair: &KeyCertPair) -> Vec<u8> {
    let key_id = base_key_id(pair.cert());
    match pair.key() {
        PrivateKey::Rsa(rsa) => sequence([
            label(),
            sequence([
                octet_string(&key_id),
                bit_string(&[RSA_PUBLIC_USAGE]),
                bit_string(&[PUBLIC_ACCESS_FLAGS]),
            ]),
            explicit_compound(
                1,
                [sequence([
                    explicit_compound(
                        0,
                        [explicit_compound(
                            1,
                            [
                                sequence([object_identifier(&oid::RSA_ENCRYPTION), null()]),
                                bit_string(&sequence([integer(&rsa.n), integer(&rsa.e)])),
                            ],
                        )],
                    ),
                    // modulus length in bytes
                    integer_from_u64(rsa.n.bits() / 8),
                ])],
            ),
        ]),
        PrivateKey::Ec(ec) => explicit_compound(
            0,
            [
                label(),
                sequence([
                    octet_string(&key_id),
                    bit_string(&[EC_PUBLIC_USAGE]),
                    bit_string(&[PUBLIC_ACCESS_FLAGS]),
                ]),
                explicit_compound(
                    1,
                    [sequence([explicit_compound(
                        0,
                        [sequence([
                            sequence([
                                object_identifier(&oid::EC_PUBLIC_KEY),
                                object_identifier(&ec.curve.oid()),
                            ]),
                            bit_string(&ec.public_point),
                        ])],
                    )])],
                ),
            ],
        ),
    }
}

impl KeyCertPair {
    /// Bundle holding the sealed private key and a public key stub, without a certificate.
    ///
    /// This is the layout the vendor tool writes when it generates a key, and it is never
    /// headered.
    pub fn to_key_bundle<R>(&self, rng: &mut R) -> Result<Vec<u8>, Pkcs15Error>
    where
        R: RngCore + CryptoRng,
    {
        let envelope = self.envelope(rng)?;
        let key = self.key();

        let key_ids = match key {
            PrivateKey::Rsa(_) => [
                Some(key_id_2(self.cert())),
                key_id_8(key),
                key_id_9(key, self.cert()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>(),
            PrivateKey::Ec(_) => vec![key_id_2(self.cert())],
        };

        let private_key = key_object(
            key,
            [
                label(),
                sequence([
                    octet_string(&base_key_id(self.cert())),
                    bit_string(&[private_usage(key)]),
                    bit_string(&[PRIVATE_ACCESS_FLAGS]),
                ]),
                explicit_compound(0, [sequence([explicit_compound(0, key_ids)])]),
                enveloped_value(envelope.as_der()),
            ],
        );

        let bundle = content_info([
            directory(PRIVATE_KEYS, private_key),
            directory(PUBLIC_KEYS, public_key_object(self)),
        ]);
        tracing::debug!(len = bundle.len(), "built key bundle");
        Ok(bundle)
    }

    /// Bundle holding the sealed private key and the certificate. Needs a file header before the
    /// firmware accepts it.
    pub fn to_key_cert_bundle<R>(&self, rng: &mut R) -> Result<Vec<u8>, Pkcs15Error>
    where
        R: RngCore + CryptoRng,
    {
        let envelope = self.envelope(rng)?;
        let key = self.key();
        let cert = self.cert();
        let key_id = base_key_id(cert);

        let private_key = key_object(
            key,
            [
                label(),
                sequence([
                    octet_string(&key_id),
                    bit_string(&[private_usage(key)]),
                    bit_string(&[PRIVATE_ACCESS_FLAGS]),
                    generalized_time(&cert.not_before()),
                    generalized_time_explicit_value(0, &cert.not_after()),
                ]),
                enveloped_value(envelope.as_der()),
            ],
        );

        let key_ids = [
            Some(key_id_2(cert)),
            Some(key_id_3(cert)),
            Some(key_id_6(cert)),
            Some(key_id_7(cert)),
            key_id_8(key),
            key_id_9(key, cert),
        ]
        .into_iter()
        .flatten();

        let certificate = sequence([
            label(),
            sequence([
                octet_string(&key_id),
                explicit_compound(2, key_ids),
                generalized_time(&cert.not_before()),
                generalized_time_explicit_value(4, &cert.not_after()),
            ]),
            explicit_compound(1, [sequence([explicit_compound(0, [cert.raw()])])]),
        ]);

        let bundle = content_info([
            directory(PRIVATE_KEYS, private_key),
            directory(CERTIFICATES, certificate),
        ]);
        tracing::debug!(len = bundle.len(), "built key and certificate bundle");
        Ok(bundle)
    }

    /// Bundle holding only the certificate, identified by key id 2. For firmware that predates
    /// the `ssl` command and loads key material separately.
    pub fn to_legacy_bundle(&self) -> Vec<u8> {
        let cert = self.cert();
        let certificate = sequence([
            label(),
            sequence([
                octet_string(&base_key_id(cert)),
                explicit_compound(2, [key_id_2(cert)]),
                generalized_time(&cert.not_before()),
                generalized_time_explicit_value(4, &cert.not_after()),
            ]),
            explicit_compound(1, [sequence([explicit_compound(0, [cert.raw()])])]),
        ]);

        let bundle = content_info([directory(CERTIFICATES, certificate)]);
        tracing::debug!(len = bundle.len(), "built legacy certificate bundle");
        bundle
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const RSA_KEY: &[u8] = include_bytes!("../resources/rsa2048.key.pem");
    const RSA_CERT: &[u8] = include_bytes!("../resources/rsa2048.cert.pem");
    const P256_KEY: &[u8] = include_bytes!("../resources/p256.key.pem");
    const P256_CERT: &[u8] = include_bytes!("../resources/p256.cert.pem");

    fn rng() -> rand_chacha::ChaCha8Rng {
        rand_chacha::ChaCha8Rng::seed_from_u64(42)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_bundles_share_one_envelope() {
        let pair = KeyCertPair::from_pem(RSA_KEY, RSA_CERT).unwrap();
        let key_bundle = pair.to_key_bundle(&mut rng()).unwrap();
        let key_cert_bundle = pair
            .to_key_cert_bundle(&mut rand_chacha::ChaCha8Rng::seed_from_u64(7))
            .unwrap();

        let envelope = pair.envelope(&mut rng()).unwrap().as_der().to_vec();
        assert!(contains(&key_bundle, &envelope));
        assert!(contains(&key_cert_bundle, &envelope));
    }

    #[test]
    fn test_bundle_is_deterministic_for_a_seed() {
        let a = KeyCertPair::from_pem(RSA_KEY, RSA_CERT)
            .unwrap()
            .to_key_cert_bundle(&mut rng())
            .unwrap();
        let b = KeyCertPair::from_pem(RSA_KEY, RSA_CERT)
            .unwrap()
            .to_key_cert_bundle(&mut rng())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rsa_key_cert_bundle_layout() {
        let pair = KeyCertPair::from_pem(RSA_KEY, RSA_CERT).unwrap();
        let bundle = pair.to_key_cert_bundle(&mut rng()).unwrap();

        assert_eq!(bundle[0], 0x30);
        assert!(contains(&bundle[..16], &object_identifier(&oid::PKCS15_CONTENT)));
        assert!(contains(&bundle, pair.cert().raw()));
        // usage and access flag bit strings
        assert!(contains(&bundle, &[0x03, 0x02, 0x01, 0xe2, 0x03, 0x02, 0x04, 0xb0]));
        // startDate, then endDate as [0] primitive
        assert!(contains(&bundle, b"\x18\x0f20240101000000Z\x80\x0f20340101000000Z"));
        // every certificate key id, including the RSA only ones
        for id in [
            key_id_2(pair.cert()),
            key_id_3(pair.cert()),
            key_id_6(pair.cert()),
            key_id_7(pair.cert()),
            key_id_8(pair.key()).unwrap(),
            key_id_9(pair.key(), pair.cert()).unwrap(),
        ] {
            assert!(contains(&bundle, &id));
        }
        // certificate directory is [4]
        assert!(contains(&bundle, b"\x84\x0f20340101000000Z"));
    }

    #[test]
    fn test_ec_key_cert_bundle_layout() {
        let pair = KeyCertPair::from_pem(P256_KEY, P256_CERT).unwrap();
        let bundle = pair.to_key_cert_bundle(&mut rng()).unwrap();

        // no non-repudiation bit for EC
        assert!(contains(&bundle, &[0x03, 0x02, 0x01, 0x22, 0x03, 0x02, 0x04, 0xb0]));
        assert!(!contains(&bundle, &[0x03, 0x02, 0x01, 0xe2]));
        // key ids 8 and 9 are left out
        assert!(!contains(&bundle, &[0x02, 0x01, 0x08, 0x04, 0x08]));
        assert!(!contains(&bundle, &[0x02, 0x01, 0x09, 0x04, 0x08]));
        assert!(contains(&bundle, &key_id_7(pair.cert())));
    }

    #[test]
    fn test_rsa_key_bundle_public_key_stub() {
        let pair = KeyCertPair::from_pem(RSA_KEY, RSA_CERT).unwrap();
        let bundle = pair.to_key_bundle(&mut rng()).unwrap();

        let PrivateKey::Rsa(rsa) = pair.key() else {
            panic!("expected an RSA key");
        };
        let rsa_public_key = sequence([integer(&rsa.n), integer(&rsa.e)]);
        assert!(contains(&bundle, &bit_string(&rsa_public_key)));
        // public usage and access flags
        assert!(contains(&bundle, &[0x03, 0x02, 0x01, 0x82, 0x03, 0x02, 0x06, 0x40]));
        // modulus byte length
        assert!(contains(&bundle, &[0x02, 0x02, 0x01, 0x00]));
        // no certificate
        assert!(!contains(&bundle, pair.cert().raw()));
        assert!(contains(&bundle, &key_id_9(pair.key(), pair.cert()).unwrap()));
    }

    #[test]
    fn test_ec_key_bundle_public_key_stub() {
        let pair = KeyCertPair::from_pem(P256_KEY, P256_CERT).unwrap();
        let bundle = pair.to_key_bundle(&mut rng()).unwrap();

        let PrivateKey::Ec(ec) = pair.key() else {
            panic!("expected an EC key");
        };
        assert!(contains(&bundle, &bit_string(&ec.public_point)));
        assert!(contains(&bundle, &object_identifier(&oid::PRIME256V1)));
        assert!(contains(&bundle, &[0x03, 0x02, 0x01, 0x02, 0x03, 0x02, 0x06, 0x40]));
        assert!(!contains(&bundle, &[0x02, 0x01, 0x08, 0x04, 0x08]));
    }

    #[test]
    fn test_legacy_bundle_only_has_key_id_2() {
        let pair = KeyCertPair::from_pem(RSA_KEY, RSA_CERT).unwrap();
        let bundle = pair.to_legacy_bundle();

        assert!(contains(&bundle, pair.cert().raw()));
        assert!(contains(&bundle, &explicit_compound(2, [key_id_2(pair.cert())])));
        assert!(!contains(&bundle, &key_id_3(pair.cert())));
        assert!(!contains(&bundle, &[0x02, 0x01, 0x02, 0x31]));
    }
}
