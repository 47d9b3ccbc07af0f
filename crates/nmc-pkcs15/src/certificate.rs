use chrono::{DateTime, TimeZone, Utc};
use const_oid::ObjectIdentifier;
use num_bigint::BigUint;
use x509_parser::{
    prelude::{FromDer, X509Certificate},
    public_key::PublicKey,
};

use crate::error::Pkcs15Error;

/// An extension present on the certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateExtension {
    /// Extension identifier.
    pub oid: ObjectIdentifier,
    /// Whether the extension is marked critical.
    pub critical: bool,
}

/// The public key carried in the certificate's SubjectPublicKeyInfo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CertificatePublicKey {
    Rsa {
        n: BigUint,
        e: BigUint,
    },
    Ec {
        curve: Option<ObjectIdentifier>,
        point: Vec<u8>,
    },
    Other,
}

/// The parts of an X.509 certificate the bundle needs, decoded once.
#[derive(Clone, Debug)]
pub struct Certificate {
    raw: Vec<u8>,
    raw_issuer: Vec<u8>,
    raw_subject: Vec<u8>,
    raw_subject_public_key_info: Vec<u8>,
    serial: BigUint,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    signature_algorithm: ObjectIdentifier,
    extensions: Vec<CertificateExtension>,
    pub(crate) public_key: CertificatePublicKey,
}

fn convert_oid(oid: &x509_parser::oid_registry::Oid<'_>) -> Result<ObjectIdentifier, Pkcs15Error> {
    ObjectIdentifier::from_bytes(oid.as_bytes())
        .map_err(|e| Pkcs15Error::InvalidCertificate(format!("oid {oid}: {e}")))
}

fn convert_time(timestamp: i64) -> Result<DateTime<Utc>, Pkcs15Error> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| Pkcs15Error::InvalidCertificate(format!("invalid time {timestamp}")))
}

impl Certificate {
    /// Decode a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, Pkcs15Error> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Pkcs15Error::InvalidCertificate(e.to_string()))?;

        let spki = cert.public_key();
        let public_key = match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => CertificatePublicKey::Rsa {
                n: BigUint::from_bytes_be(rsa.modulus),
                e: BigUint::from_bytes_be(rsa.exponent),
            },
            Ok(PublicKey::EC(point)) => CertificatePublicKey::Ec {
                curve: spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|params| params.as_oid().ok())
                    .map(|oid| convert_oid(&oid))
                    .transpose()?,
                point: point.data().to_vec(),
            },
            _ => CertificatePublicKey::Other,
        };

        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| {
                Ok(CertificateExtension {
                    oid: convert_oid(&ext.oid)?,
                    critical: ext.critical,
                })
            })
            .collect::<Result<Vec<_>, Pkcs15Error>>()?;

        Ok(Certificate {
            raw: der.to_vec(),
            raw_issuer: cert.issuer().as_raw().to_vec(),
            raw_subject: cert.subject().as_raw().to_vec(),
            raw_subject_public_key_info: spki.raw.to_vec(),
            serial: BigUint::from_bytes_be(cert.raw_serial()),
            not_before: convert_time(cert.validity().not_before.timestamp())?,
            not_after: convert_time(cert.validity().not_after.timestamp())?,
            signature_algorithm: convert_oid(&cert.signature_algorithm.algorithm)?,
            extensions,
            public_key,
        })
    }

    /// The complete certificate DER.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// DER of the issuer name.
    pub fn raw_issuer(&self) -> &[u8] {
        &self.raw_issuer
    }

    /// DER of the subject name.
    pub fn raw_subject(&self) -> &[u8] {
        &self.raw_subject
    }

    /// DER of the SubjectPublicKeyInfo.
    pub fn raw_subject_public_key_info(&self) -> &[u8] {
        &self.raw_subject_public_key_info
    }

    #[allow(missing_docs)]
    pub fn serial(&self) -> &BigUint {
        &self.serial
    }

    #[allow(missing_docs)]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    #[allow(missing_docs)]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    #[allow(missing_docs)]
    pub fn signature_algorithm(&self) -> &ObjectIdentifier {
        &self.signature_algorithm
    }

    #[allow(missing_docs)]
    pub fn extensions(&self) -> &[CertificateExtension] {
        &self.extensions
    }
}
