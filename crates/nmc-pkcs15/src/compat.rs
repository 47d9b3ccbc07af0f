//! Checks a certificate against what NMC firmware is known to load.
//!
//! Warnings never stop a conversion. They point at the likely cause when a device silently
//! replaces the uploaded certificate with a self-signed one.

use std::fmt;

use chrono::{DateTime, Utc};
use const_oid::{ObjectIdentifier, db::DB};

use crate::{key::KeyType, pair::KeyCertPair};

const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

const NMC2_SIGNATURE_ALGORITHMS: &[ObjectIdentifier] = &[SHA256_WITH_RSA];
const NMC3_SIGNATURE_ALGORITHMS: &[ObjectIdentifier] = &[SHA256_WITH_RSA, ECDSA_WITH_SHA384];

const CRITICAL_EXTENSIONS: &[ObjectIdentifier] = &[
    ObjectIdentifier::new_unwrap("2.5.29.15"), // keyUsage
    ObjectIdentifier::new_unwrap("2.5.29.19"), // basicConstraints
    ObjectIdentifier::new_unwrap("2.5.29.17"), // subjectAltName
];

const NON_CRITICAL_EXTENSIONS: &[ObjectIdentifier] = &[
    ObjectIdentifier::new_unwrap("2.5.29.37"),               // extKeyUsage
    ObjectIdentifier::new_unwrap("2.5.29.14"),               // subjectKeyIdentifier
    ObjectIdentifier::new_unwrap("2.5.29.35"),               // authorityKeyIdentifier
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1"),       // authorityInfoAccess
    ObjectIdentifier::new_unwrap("2.5.29.32"),               // certificatePolicies
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11129.2.4.2"), // SCT list
    ObjectIdentifier::new_unwrap("2.5.29.31"),               // cRLDistributionPoints
];

/// A possible incompatibility between the input and NMC firmware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompatibilityWarning {
    /// The key cannot be loaded by NMC2 firmware.
    KeyNotNmc2(KeyType),
    /// Known to work on NMC3 only.
    SignatureNmc3Only(ObjectIdentifier),
    /// Not on any known-good list. `nmc2_key` is set when the key itself would suit NMC2.
    SignatureUnknown {
        #[allow(missing_docs)]
        algorithm: ObjectIdentifier,
        #[allow(missing_docs)]
        nmc2_key: bool,
    },
    /// The certificate's NotBefore lies in the future.
    NotYetValid {
        #[allow(missing_docs)]
        now: DateTime<Utc>,
        #[allow(missing_docs)]
        not_before: DateTime<Utc>,
    },
    /// The certificate's NotAfter has passed.
    Expired {
        #[allow(missing_docs)]
        now: DateTime<Utc>,
        #[allow(missing_docs)]
        not_after: DateTime<Utc>,
    },
    /// An extension the firmware is not known to accept.
    Extension {
        #[allow(missing_docs)]
        oid: ObjectIdentifier,
        #[allow(missing_docs)]
        critical: bool,
    },
}

impl CompatibilityWarning {
    /// Extension warnings are informational; the rest make a rejected upload likely.
    pub fn is_likely_failure(&self) -> bool {
        !matches!(self, CompatibilityWarning::Extension { .. })
    }
}

fn oid_name(oid: &ObjectIdentifier) -> String {
    DB.by_oid(oid)
        .map(str::to_owned)
        .unwrap_or_else(|| oid.to_string())
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const TIME: &str = "%Y-%m-%dT%H:%M:%SZ";
        match self {
            CompatibilityWarning::KeyNotNmc2(key_type) => {
                write!(f, "key type is {key_type} and is not supported by NMC2")
            }
            CompatibilityWarning::SignatureNmc3Only(algorithm) => write!(
                f,
                "certificate signing algorithm is {} and it does not support NMC2",
                oid_name(algorithm)
            ),
            CompatibilityWarning::SignatureUnknown {
                algorithm,
                nmc2_key: true,
            } => write!(
                f,
                "certificate signing algorithm is {} and is not supported by NMC2, it is also not \
                 known if NMC3 supports this algorithm",
                oid_name(algorithm)
            ),
            CompatibilityWarning::SignatureUnknown {
                algorithm,
                nmc2_key: false,
            } => write!(
                f,
                "certificate signing algorithm is {} and it is not known if NMC3 supports this \
                 algorithm",
                oid_name(algorithm)
            ),
            CompatibilityWarning::NotYetValid { now, not_before } => write!(
                f,
                "current time ({}) is before certificate's NotBefore time ({})",
                now.format(TIME),
                not_before.format(TIME)
            ),
            CompatibilityWarning::Expired { now, not_after } => write!(
                f,
                "current time ({}) is after certificate's NotAfter time ({})",
                now.format(TIME),
                not_after.format(TIME)
            ),
            CompatibilityWarning::Extension { oid, critical } => write!(
                f,
                "{}extension {} may not be supported by NMC",
                if *critical { "critical " } else { "" },
                oid_name(oid)
            ),
        }
    }
}

/// Collect every compatibility warning for `pair` as of `now`.
pub fn check_compatibility(pair: &KeyCertPair, now: DateTime<Utc>) -> Vec<CompatibilityWarning> {
    let mut warnings = Vec::new();
    let cert = pair.cert();
    let key_type = pair.key_type();
    let nmc2_key = key_type.is_nmc2_supported();

    if !nmc2_key {
        warnings.push(CompatibilityWarning::KeyNotNmc2(key_type));
    }

    let algorithm = *cert.signature_algorithm();
    if !NMC3_SIGNATURE_ALGORITHMS.contains(&algorithm) {
        warnings.push(CompatibilityWarning::SignatureUnknown {
            algorithm,
            nmc2_key,
        });
    } else if nmc2_key && !NMC2_SIGNATURE_ALGORITHMS.contains(&algorithm) {
        warnings.push(CompatibilityWarning::SignatureNmc3Only(algorithm));
    }

    if now < cert.not_before() {
        warnings.push(CompatibilityWarning::NotYetValid {
            now,
            not_before: cert.not_before(),
        });
    }
    if now > cert.not_after() {
        warnings.push(CompatibilityWarning::Expired {
            now,
            not_after: cert.not_after(),
        });
    }

    for extension in cert.extensions() {
        let known = CRITICAL_EXTENSIONS.contains(&extension.oid)
            || (!extension.critical && NON_CRITICAL_EXTENSIONS.contains(&extension.oid));
        if !known {
            warnings.push(CompatibilityWarning::Extension {
                oid: extension.oid,
                critical: extension.critical,
            });
        }
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    if warnings.iter().any(CompatibilityWarning::is_likely_failure) {
        tracing::warn!(
            "possible certificate compatibility issues were detected; if the device regenerates a \
             self-signed certificate after the upload, resolve the warnings and try again"
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn pair(key: &[u8], cert: &[u8]) -> KeyCertPair {
        KeyCertPair::from_pem(key, cert).unwrap()
    }

    fn in_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rsa_sha256_is_clean() {
        let pair = pair(
            include_bytes!("../resources/rsa2048.key.pem"),
            include_bytes!("../resources/rsa2048.cert.pem"),
        );
        assert_eq!(check_compatibility(&pair, in_2025()), vec![]);
    }

    #[test]
    fn test_p256_warns_about_key_and_signature() {
        let pair = pair(
            include_bytes!("../resources/p256.key.pem"),
            include_bytes!("../resources/p256.cert.pem"),
        );
        let warnings = check_compatibility(&pair, in_2025());
        assert_eq!(
            warnings,
            vec![
                CompatibilityWarning::KeyNotNmc2(KeyType::EcP256),
                CompatibilityWarning::SignatureUnknown {
                    algorithm: ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2"),
                    nmc2_key: false,
                },
            ]
        );
        assert_eq!(
            warnings[1].to_string(),
            "certificate signing algorithm is ecdsa-with-SHA256 and it is not known if NMC3 \
             supports this algorithm"
        );
    }

    #[test]
    fn test_p384_flags_unknown_critical_extension() {
        let pair = pair(
            include_bytes!("../resources/p384.key.pem"),
            include_bytes!("../resources/p384.cert.pem"),
        );
        let warnings = check_compatibility(&pair, in_2025());
        assert_eq!(
            warnings,
            vec![
                CompatibilityWarning::KeyNotNmc2(KeyType::EcP384),
                CompatibilityWarning::Extension {
                    oid: ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1"),
                    critical: true,
                },
            ]
        );
        assert!(!warnings[1].is_likely_failure());
    }

    #[test]
    fn test_validity_window() {
        let pair = pair(
            include_bytes!("../resources/rsa2048.key.pem"),
            include_bytes!("../resources/rsa2048.cert.pem"),
        );
        let early = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(
            check_compatibility(&pair, early).as_slice(),
            [CompatibilityWarning::NotYetValid { .. }]
        ));
        let expired = check_compatibility(&pair, late);
        assert!(matches!(expired.as_slice(), [CompatibilityWarning::Expired { .. }]));
        assert_eq!(
            expired[0].to_string(),
            "current time (2035-01-01T00:00:00Z) is after certificate's NotAfter time \
             (2034-01-01T00:00:00Z)"
        );
    }
}
