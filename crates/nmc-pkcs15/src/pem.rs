//! PEM decoding of the input key and certificate.

use num_bigint::BigUint;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::PrivateKeyInfo;
use rsa::{
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey,
    traits::{PrivateKeyParts, PublicKeyParts},
};
use x509_parser::pem::Pem;
use zeroize::Zeroizing;

use crate::{
    certificate::Certificate,
    error::Pkcs15Error,
    key::{EcCurve, EcKey, PrivateKey, RsaKey},
};

const RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
const EC_PRIVATE_KEY: &str = "EC PRIVATE KEY";
const PRIVATE_KEY: &str = "PRIVATE KEY";
const EC_PARAMETERS: &str = "EC PARAMETERS";
const CERTIFICATE: &str = "CERTIFICATE";

fn pem_blocks(input: &[u8]) -> impl Iterator<Item = Result<Pem, Pkcs15Error>> + '_ {
    Pem::iter_from_buffer(input)
        .map(|block| block.map_err(|e| Pkcs15Error::InvalidPem(e.to_string())))
}

/// Decode the first private key in `key_pem`.
///
/// Accepts PKCS#1 RSA, SEC1 EC and PKCS#8 keys. A leading `EC PARAMETERS` block is skipped.
pub fn decode_private_key(key_pem: &[u8]) -> Result<PrivateKey, Pkcs15Error> {
    let block = pem_blocks(key_pem)
        .find(|block| !matches!(block, Ok(pem) if pem.label == EC_PARAMETERS))
        .ok_or(Pkcs15Error::MissingPemBlock("key"))??;
    let der = Zeroizing::new(block.contents);

    match block.label.as_str() {
        RSA_PRIVATE_KEY => rsa_from_pkcs1(&der),
        EC_PRIVATE_KEY => ec_from_sec1(&der, None),
        PRIVATE_KEY => {
            let info = PrivateKeyInfo::try_from(der.as_slice())
                .map_err(|e| Pkcs15Error::InvalidKey(e.to_string()))?;
            if info.algorithm.oid == nmc_der::oid::RSA_ENCRYPTION {
                rsa_from_pkcs1(info.private_key)
            } else if info.algorithm.oid == nmc_der::oid::EC_PUBLIC_KEY {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| Pkcs15Error::InvalidKey(e.to_string()))?;
                ec_from_sec1(info.private_key, Some(curve))
            } else {
                Err(Pkcs15Error::UnsupportedKey(format!(
                    "algorithm {}",
                    info.algorithm.oid
                )))
            }
        }
        label => Err(Pkcs15Error::UnsupportedPemBlock(label.to_owned())),
    }
}

fn to_biguint(value: &rsa::BigUint) -> BigUint {
    BigUint::from_bytes_be(&value.to_bytes_be())
}

fn rsa_from_pkcs1(der: &[u8]) -> Result<PrivateKey, Pkcs15Error> {
    let key =
        RsaPrivateKey::from_pkcs1_der(der).map_err(|e| Pkcs15Error::InvalidKey(e.to_string()))?;
    key.validate()
        .map_err(|e| Pkcs15Error::InvalidKey(format!("failed sanity check ({e})")))?;

    let [p, q] = key.primes() else {
        return Err(Pkcs15Error::UnsupportedKey(format!(
            "RSA with {} primes",
            key.primes().len()
        )));
    };

    RsaKey::new(
        to_biguint(key.n()),
        to_biguint(key.e()),
        &to_biguint(key.d()),
        to_biguint(p),
        to_biguint(q),
    )
    .map(PrivateKey::Rsa)
}

fn ec_from_sec1(
    der: &[u8],
    curve_hint: Option<const_oid::ObjectIdentifier>,
) -> Result<PrivateKey, Pkcs15Error> {
    let sec1_key =
        sec1::EcPrivateKey::try_from(der).map_err(|e| Pkcs15Error::InvalidKey(e.to_string()))?;
    let curve_oid = sec1_key
        .parameters
        .and_then(|params| params.named_curve())
        .or(curve_hint)
        .ok_or_else(|| Pkcs15Error::InvalidKey("missing named curve".into()))?;
    let curve = EcCurve::from_oid(&curve_oid)
        .ok_or_else(|| Pkcs15Error::UnsupportedKey(format!("curve {curve_oid}")))?;

    let secret = sec1_key.private_key;
    let invalid = |e: p256::elliptic_curve::Error| Pkcs15Error::InvalidKey(e.to_string());
    let public_point = match curve {
        EcCurve::P256 => p256::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec(),
        EcCurve::P384 => p384::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec(),
        EcCurve::P521 => p521::SecretKey::from_slice(secret)
            .map_err(invalid)?
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec(),
    };

    Ok(PrivateKey::Ec(EcKey {
        curve,
        scalar: BigUint::from_bytes_be(secret),
        public_point,
    }))
}

/// Decode the first certificate in `cert_pem`. Any further chain members are ignored.
pub fn decode_certificate(cert_pem: &[u8]) -> Result<Certificate, Pkcs15Error> {
    let block = pem_blocks(cert_pem)
        .next()
        .ok_or(Pkcs15Error::MissingPemBlock("certificate"))??;
    if block.label != CERTIFICATE {
        return Err(Pkcs15Error::UnsupportedPemBlock(block.label));
    }
    Certificate::from_der(&block.contents)
}
