use chrono::Utc;
use rand::{CryptoRng, RngCore};

use crate::{
    compat::{CompatibilityWarning, check_compatibility},
    error::Pkcs15Error,
    header::with_header,
    key::KeyType,
    pair::KeyCertPair,
};

/// Every artifact produced from one key and certificate.
#[derive(Debug)]
pub struct Conversion {
    /// Key-only bundle, never headered.
    pub key_p15: Vec<u8>,
    /// Headered key and certificate bundle. Only produced for key types NMC2 can load.
    pub key_cert_p15: Option<Vec<u8>>,
    /// Headered certificate-only bundle for firmware without the `ssl` command. Produced under
    /// the same condition as `key_cert_p15`.
    pub legacy_p15: Option<Vec<u8>>,
    #[allow(missing_docs)]
    pub key_type: KeyType,
    #[allow(missing_docs)]
    pub warnings: Vec<CompatibilityWarning>,
}

/// Convert a PEM key and certificate into NMC bundles.
///
/// The private key is sealed once and that envelope is embedded in every bundle.
pub fn convert<R>(key_pem: &[u8], cert_pem: &[u8], rng: &mut R) -> Result<Conversion, Pkcs15Error>
where
    R: RngCore + CryptoRng,
{
    let pair = KeyCertPair::from_pem(key_pem, cert_pem)?;
    convert_pair(&pair, rng)
}

/// [`convert`] for an already decoded pair.
pub fn convert_pair<R>(pair: &KeyCertPair, rng: &mut R) -> Result<Conversion, Pkcs15Error>
where
    R: RngCore + CryptoRng,
{
    let key_type = pair.key_type();
    tracing::info!(%key_type, "making p15 bundles");

    let key_p15 = pair.to_key_bundle(rng)?;

    let (key_cert_p15, legacy_p15) = if key_type.is_nmc2_supported() {
        (
            Some(with_header(&pair.to_key_cert_bundle(rng)?)?),
            Some(with_header(&pair.to_legacy_bundle())?),
        )
    } else {
        tracing::info!(%key_type, "key type is not supported by NMC2, skipping key+cert bundle");
        (None, None)
    };

    let warnings = check_compatibility(pair, Utc::now());

    Ok(Conversion {
        key_p15,
        key_cert_p15,
        legacy_p15,
        key_type,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use rand::{CryptoRng, RngCore, SeedableRng};

    use super::*;
    use crate::header::{FileHeader, HEADER_LEN, crc16_xmodem};

    const RSA_KEY: &[u8] = include_bytes!("../resources/rsa2048.key.pem");
    const RSA_CERT: &[u8] = include_bytes!("../resources/rsa2048.cert.pem");

    /// Replays fixed bytes, then zeros. Stands in for a fixed random source.
    struct ScriptedRng {
        script: Vec<u8>,
        pos: usize,
    }

    impl ScriptedRng {
        fn new(script: Vec<u8>) -> Self {
            ScriptedRng { script, pos: 0 }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let mut buf = [0u8; 4];
            self.fill_bytes(&mut buf);
            u32::from_le_bytes(buf)
        }
        fn next_u64(&mut self) -> u64 {
            let mut buf = [0u8; 8];
            self.fill_bytes(&mut buf);
            u64::from_le_bytes(buf)
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for byte in dest {
                *byte = self.script.get(self.pos).copied().unwrap_or(0);
                self.pos += 1;
            }
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ScriptedRng {}

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_fixed_randomness_scenario() {
        // kek salt, then the CEK 00..0f, then zero padding and salts
        let mut script = vec![0u8; 8];
        script.extend(0u8..16);
        let conversion = convert(RSA_KEY, RSA_CERT, &mut ScriptedRng::new(script)).unwrap();

        // zero wrap salt and padding give a known encrypted CEK
        let encrypted_cek =
            hex::decode("cdc1f1690cb02aaaa95813cf3f2d2e544a7ed24e7fe2815d").unwrap();
        assert!(contains(&conversion.key_p15, &encrypted_cek));

        let artifact = conversion.key_cert_p15.unwrap();
        let (header, bundle) = artifact.split_at(HEADER_LEN);
        assert_eq!(&header[0..4], &1u32.to_le_bytes());
        assert_eq!(
            u32::from_le_bytes([header[216], header[217], header[218], header[219]]) as usize,
            bundle.len()
        );
        assert!(contains(bundle, &encrypted_cek));

        let rebuilt = FileHeader::new(bundle).unwrap();
        assert_eq!(header, &rebuilt.as_bytes()[..]);
        assert_eq!(rebuilt.bundle_crc(), crc16_xmodem(bundle));
        assert_eq!(rebuilt.header_crc(), crc16_xmodem(&header[..224]));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let a = convert(RSA_KEY, RSA_CERT, &mut rand_chacha::ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = convert(RSA_KEY, RSA_CERT, &mut rand_chacha::ChaCha8Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a.key_p15, b.key_p15);
        assert_eq!(a.key_cert_p15, b.key_cert_p15);
        assert_eq!(a.legacy_p15, b.legacy_p15);
    }

    #[test]
    fn test_ec_key_only_gets_key_bundle() {
        let conversion = convert(
            include_bytes!("../resources/p256.key.pem"),
            include_bytes!("../resources/p256.cert.pem"),
            &mut rand_chacha::ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap();

        assert_eq!(conversion.key_type, KeyType::EcP256);
        assert!(conversion.key_cert_p15.is_none());
        assert!(conversion.legacy_p15.is_none());
        assert!(!conversion.key_p15.is_empty());
        assert!(conversion
            .warnings
            .contains(&CompatibilityWarning::KeyNotNmc2(KeyType::EcP256)));
    }

    #[test]
    fn test_rsa_gets_all_bundles() {
        let conversion =
            convert(RSA_KEY, RSA_CERT, &mut rand_chacha::ChaCha8Rng::seed_from_u64(1)).unwrap();

        assert_eq!(conversion.key_type, KeyType::Rsa2048);
        let legacy = conversion.legacy_p15.unwrap();
        assert_eq!(&legacy[8..8 + crate::TOOL_NAME.len()], crate::TOOL_NAME.as_bytes());
        assert!(conversion.key_cert_p15.unwrap().len() > conversion.key_p15.len());
    }
}
