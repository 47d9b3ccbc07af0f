use std::num::NonZeroU32;

use hmac::Mac;
use nmc_der::{
    explicit_compound, explicit_value, integer_from_u64, null, object_identifier, octet_string, oid,
    sequence, set,
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    CEK_SIZE, KEK_SIZE, MAC_SIZE, SALT_SIZE, ensure_len,
    error::EnvelopeError,
    key_wrap::{encrypt_wrapped_cek, format_wrapped_cek, unwrap_cek},
    profile::DeviceProfile,
    tdes,
    util::{generate_random_bytes, pbkdf2_sha1_once, pbkdf2_sha256},
};

const ENVELOPE_VERSION: u64 = 2;
const PWRI_VERSION: u64 = 0;

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

/// Derive the KEK for `profile` from an 8 byte salt.
pub fn derive_kek(
    profile: &DeviceProfile,
    salt: &[u8],
) -> Result<Zeroizing<[u8; KEK_SIZE]>, EnvelopeError> {
    ensure_len!(salt, SALT_SIZE, "kek salt");
    pbkdf2_sha256(profile.kek_password.as_bytes(), salt, profile.kek_iterations)
}

fn derive_content_key(cek: &[u8]) -> Result<Zeroizing<[u8; KEK_SIZE]>, EnvelopeError> {
    pbkdf2_sha1_once(cek, b"encryption")
}

fn derive_mac_key(cek: &[u8]) -> Result<Zeroizing<[u8; MAC_SIZE]>, EnvelopeError> {
    pbkdf2_sha1_once(cek, b"authentication")
}

/// DER of the `authEnc128` algorithm identifier. It is both part of the envelope and the
/// prefix of the authenticated data.
fn encryption_algorithm(content_salt: &[u8]) -> Vec<u8> {
    sequence([
        object_identifier(&oid::AUTH_ENC_128),
        sequence([
            sequence([
                object_identifier(&oid::DES_EDE3_CBC),
                octet_string(content_salt),
            ]),
            sequence([object_identifier(&oid::HMAC_WITH_SHA256), null()]),
        ]),
    ])
}

fn content_mac(
    cek: &[u8],
    encryption_algorithm: &[u8],
    encrypted_content: &[u8],
) -> Result<HmacSha256, EnvelopeError> {
    let mac_key = derive_mac_key(cek)?;
    let mut mac =
        HmacSha256::new_from_slice(mac_key.as_slice()).map_err(|_| EnvelopeError::Kdf)?;
    mac.update(encryption_algorithm);
    mac.update(encrypted_content);
    Ok(mac)
}

/// A sealed private key object.
///
/// Holds every field needed to serialize or open it again. The DER form is the concatenation
/// `version || recipientInfos || encryptedContentInfo || mac`, without an enclosing SEQUENCE;
/// the container supplies the outer tag.
#[derive(Clone, Debug)]
pub struct Envelope {
    kek_salt: [u8; SALT_SIZE],
    kek_iterations: NonZeroU32,
    cek_wrap_salt: [u8; SALT_SIZE],
    encrypted_cek: Vec<u8>,
    content_salt: [u8; SALT_SIZE],
    encrypted_content: Vec<u8>,
    mac: [u8; MAC_SIZE],
    der: Vec<u8>,
}

impl Envelope {
    /// Encrypt and authenticate `plaintext` for `profile`.
    ///
    /// Random values are drawn in a fixed order: KEK salt, CEK, wrap padding, CEK wrap salt,
    /// content IV.
    pub fn seal<R>(
        plaintext: &[u8],
        profile: &DeviceProfile,
        rng: &mut R,
    ) -> Result<Self, EnvelopeError>
    where
        R: RngCore + CryptoRng,
    {
        let kek_salt: [u8; SALT_SIZE] = generate_random_bytes(rng);
        let kek = derive_kek(profile, &kek_salt)?;

        let cek = Zeroizing::new(generate_random_bytes::<CEK_SIZE, _>(rng));
        let wrapped = format_wrapped_cek(cek.as_slice(), rng)?;
        let cek_wrap_salt: [u8; SALT_SIZE] = generate_random_bytes(rng);
        let encrypted_cek = encrypt_wrapped_cek(&wrapped, kek.as_slice(), &cek_wrap_salt)?;

        let content_salt: [u8; SALT_SIZE] = generate_random_bytes(rng);
        let content_key = derive_content_key(cek.as_slice())?;
        let encrypted_content =
            tdes::encrypt_padded(content_key.as_slice(), &content_salt, plaintext)?;

        let mac: [u8; MAC_SIZE] = content_mac(
            cek.as_slice(),
            &encryption_algorithm(&content_salt),
            &encrypted_content,
        )?
        .finalize()
        .into_bytes()
        .into();

        let mut envelope = Envelope {
            kek_salt,
            kek_iterations: profile.kek_iterations,
            cek_wrap_salt,
            encrypted_cek,
            content_salt,
            encrypted_content,
            mac,
            der: Vec::new(),
        };
        envelope.der = envelope.encode();

        tracing::debug!(
            plaintext_len = plaintext.len(),
            envelope_len = envelope.der.len(),
            "sealed private key envelope"
        );

        Ok(envelope)
    }

    fn encode(&self) -> Vec<u8> {
        let kdf = explicit_compound(
            0,
            [
                object_identifier(&oid::PBKDF2),
                sequence([
                    octet_string(&self.kek_salt),
                    integer_from_u64(u64::from(self.kek_iterations.get())),
                    sequence([object_identifier(&oid::HMAC_WITH_SHA256), null()]),
                ]),
            ],
        );
        let key_encryption_algorithm = sequence([
            object_identifier(&oid::PWRI_KEK),
            sequence([
                object_identifier(&oid::DES_EDE3_CBC),
                octet_string(&self.cek_wrap_salt),
            ]),
        ]);
        let recipient_infos = set([explicit_compound(
            3,
            [
                integer_from_u64(PWRI_VERSION),
                kdf,
                key_encryption_algorithm,
                octet_string(&self.encrypted_cek),
            ],
        )]);

        let encrypted_content_info = sequence([
            object_identifier(&oid::PKCS7_DATA),
            encryption_algorithm(&self.content_salt),
            explicit_value(0, &self.encrypted_content),
        ]);

        [
            integer_from_u64(ENVELOPE_VERSION),
            recipient_infos,
            encrypted_content_info,
            octet_string(&self.mac),
        ]
        .concat()
    }

    /// The serialized envelope.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// The CEK as encrypted under the KEK.
    pub fn encrypted_cek(&self) -> &[u8] {
        &self.encrypted_cek
    }

    /// IV of the first key wrap pass.
    pub fn cek_wrap_salt(&self) -> &[u8; SALT_SIZE] {
        &self.cek_wrap_salt
    }

    /// PBKDF2 salt of the KEK.
    pub fn kek_salt(&self) -> &[u8; SALT_SIZE] {
        &self.kek_salt
    }

    /// The 3DES-CBC encrypted, padded private key object.
    pub fn encrypted_content(&self) -> &[u8] {
        &self.encrypted_content
    }

    /// Recover the plaintext using the password of `profile` and the iteration count recorded in
    /// the envelope. The MAC is verified before the content is decrypted.
    pub fn open(&self, profile: &DeviceProfile) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        let recorded = DeviceProfile {
            kek_iterations: self.kek_iterations,
            ..*profile
        };
        let kek = derive_kek(&recorded, &self.kek_salt)?;
        let cek = unwrap_cek(&self.encrypted_cek, &self.cek_wrap_salt, kek.as_slice())?;

        content_mac(
            &cek,
            &encryption_algorithm(&self.content_salt),
            &self.encrypted_content,
        )?
        .verify_slice(&self.mac)
        .map_err(|_| EnvelopeError::MacMismatch)?;

        let content_key = derive_content_key(&cek)?;
        tdes::decrypt_padded(content_key.as_slice(), &self.content_salt, &self.encrypted_content)
            .map(Zeroizing::new)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn rng(seed: u64) -> rand_chacha::ChaCha8Rng {
        rand_chacha::ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn test_derive_kek_known_answer() {
        let kek = derive_kek(&DeviceProfile::apc(), &[0u8; 8]).unwrap();
        assert_eq!(
            hex::encode(*kek),
            "ae64154dbc5b4afc4b5f335751753730c696ecbe72ea11a1"
        );
    }

    #[test]
    fn test_derive_kek_rejects_short_salt() {
        assert!(matches!(
            derive_kek(&DeviceProfile::apc(), &[0u8; 4]),
            Err(EnvelopeError::InvalidLength { field: "kek salt", expected: 8, actual: 4 })
        ));
    }

    #[test]
    fn test_content_and_mac_keys_known_answer() {
        let cek: Vec<u8> = (0u8..16).collect();
        assert_eq!(
            hex::encode(*derive_content_key(&cek).unwrap()),
            "dff72481629f4b898ffb6ce870ccfd65ef7aff9f866e2d4f"
        );
        assert_eq!(
            hex::encode(*derive_mac_key(&cek).unwrap()),
            "3e401b9c01d746f779d23160bb5969d512f6a54c2428c57c711f69d0e49900d8"
        );
    }

    #[test]
    fn test_seal_open_round_trip() {
        let profile = DeviceProfile::apc();
        let plaintext = b"private key object".to_vec();

        let envelope = Envelope::seal(&plaintext, &profile, &mut rng(1)).unwrap();
        assert_eq!(envelope.encrypted_cek().len(), crate::ENCRYPTED_CEK_SIZE);
        assert_eq!(envelope.encrypted_content().len() % 8, 0);
        assert!(envelope.encrypted_content().len() > plaintext.len());

        assert_eq!(*envelope.open(&profile).unwrap(), plaintext);
    }

    #[test]
    fn test_seal_is_deterministic_for_a_seed() {
        let profile = DeviceProfile::apc();
        let a = Envelope::seal(b"abc", &profile, &mut rng(5)).unwrap();
        let b = Envelope::seal(b"abc", &profile, &mut rng(5)).unwrap();
        let c = Envelope::seal(b"abc", &profile, &mut rng(6)).unwrap();

        assert_eq!(a.as_der(), b.as_der());
        assert_ne!(a.as_der(), c.as_der());
    }

    #[test]
    fn test_cek_unwraps_with_derived_kek() {
        let profile = DeviceProfile::apc();
        let envelope = Envelope::seal(b"abc", &profile, &mut rng(2)).unwrap();

        let kek = derive_kek(&profile, envelope.kek_salt()).unwrap();
        let cek = unwrap_cek(
            envelope.encrypted_cek(),
            envelope.cek_wrap_salt(),
            kek.as_slice(),
        )
        .unwrap();
        assert_eq!(cek.len(), CEK_SIZE);
    }

    #[test]
    fn test_der_layout() {
        let envelope = Envelope::seal(b"abc", &DeviceProfile::apc(), &mut rng(3)).unwrap();
        let der = envelope.as_der();

        // INTEGER 2 followed by the SET of recipient infos
        assert_eq!(&der[..4], &[0x02, 0x01, 0x02, 0x31]);
        // [3] password recipient, version 0
        assert_eq!(der[5], 0xa3);
        // OCTET STRING holding the MAC closes the envelope
        assert_eq!(&der[der.len() - 34..der.len() - 32], &[0x04, 0x20]);
        assert_eq!(&der[der.len() - 32..], &envelope.mac[..]);
    }

    #[test]
    fn test_open_detects_tampered_mac() {
        let profile = DeviceProfile::apc();
        let mut envelope = Envelope::seal(b"abc", &profile, &mut rng(4)).unwrap();
        envelope.mac[0] ^= 0xff;

        assert!(matches!(
            envelope.open(&profile),
            Err(EnvelopeError::MacMismatch)
        ));
    }

    #[test]
    fn test_open_detects_tampered_content() {
        let profile = DeviceProfile::apc();
        let mut envelope = Envelope::seal(b"abc", &profile, &mut rng(4)).unwrap();
        envelope.encrypted_content[0] ^= 0x01;

        assert!(matches!(
            envelope.open(&profile),
            Err(EnvelopeError::MacMismatch)
        ));
    }

    #[test]
    fn test_open_with_wrong_password_fails_integrity() {
        let envelope = Envelope::seal(b"abc", &DeviceProfile::apc(), &mut rng(8)).unwrap();
        let other = DeviceProfile {
            kek_password: "admin",
            ..DeviceProfile::apc()
        };

        let err = envelope.open(&other).unwrap_err();
        assert!(err.is_integrity_failure(), "{err:?}");
    }

    #[test]
    fn test_open_uses_recorded_iterations() {
        let sealed_with = DeviceProfile {
            kek_iterations: NonZeroU32::new(10).unwrap(),
            ..DeviceProfile::apc()
        };
        let envelope = Envelope::seal(b"abc", &sealed_with, &mut rng(9)).unwrap();

        assert_eq!(*envelope.open(&DeviceProfile::apc()).unwrap(), b"abc".to_vec());
    }
}
