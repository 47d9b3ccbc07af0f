use std::fmt;

use const_oid::ObjectIdentifier;
use nmc_der::{integer, integer_explicit_value, oid, sequence};
use num_bigint::BigUint;

use crate::error::Pkcs15Error;

/// A private key the firmware can hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrivateKey {
    #[allow(missing_docs)]
    Rsa(RsaKey),
    #[allow(missing_docs)]
    Ec(EcKey),
}

impl PrivateKey {
    /// Classify the key. Every constructed key has one of the supported types.
    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Rsa(key) => key.key_type,
            PrivateKey::Ec(key) => match key.curve {
                EcCurve::P256 => KeyType::EcP256,
                EcCurve::P384 => KeyType::EcP384,
                EcCurve::P521 => KeyType::EcP521,
            },
        }
    }

    /// DER of the private key object sealed inside the envelope.
    ///
    /// RSA keys are stored by their CRT components, `SEQUENCE { [3] p, [4] q, [5] dp, [6] dq,
    /// [7] qinv }`. EC keys are stored as the bare private scalar.
    pub fn plaintext_object(&self) -> Vec<u8> {
        match self {
            PrivateKey::Rsa(key) => sequence([
                integer_explicit_value(3, &key.p),
                integer_explicit_value(4, &key.q),
                integer_explicit_value(5, &key.crt.dp),
                integer_explicit_value(6, &key.crt.dq),
                integer_explicit_value(7, &key.crt.qinv),
            ]),
            PrivateKey::Ec(key) => integer(&key.scalar),
        }
    }
}

/// Chinese remainder theorem parameters of an RSA key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrtParams {
    /// `d mod (p - 1)`
    pub dp: BigUint,
    /// `d mod (q - 1)`
    pub dq: BigUint,
    /// `q^-1 mod p`
    pub qinv: BigUint,
}

impl CrtParams {
    /// Returns `None` when `q` has no inverse modulo `p`, which means the primes are not valid.
    pub fn derive(d: &BigUint, p: &BigUint, q: &BigUint) -> Option<Self> {
        let one = BigUint::from(1u8);
        if *p <= one || *q <= one {
            return None;
        }
        Some(CrtParams {
            dp: d % (p - &one),
            dq: d % (q - &one),
            qinv: q.modinv(p)?,
        })
    }
}

/// A two-prime RSA key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaKey {
    /// Modulus
    pub n: BigUint,
    /// Public exponent
    pub e: BigUint,
    #[allow(missing_docs)]
    pub p: BigUint,
    #[allow(missing_docs)]
    pub q: BigUint,
    #[allow(missing_docs)]
    pub crt: CrtParams,
    key_type: KeyType,
}

impl RsaKey {
    /// Build a key from its components, rejecting unsupported modulus sizes.
    pub fn new(
        n: BigUint,
        e: BigUint,
        d: &BigUint,
        p: BigUint,
        q: BigUint,
    ) -> Result<Self, Pkcs15Error> {
        let key_type = match n.bits() {
            1024 => KeyType::Rsa1024,
            2048 => KeyType::Rsa2048,
            3072 => KeyType::Rsa3072,
            4096 => KeyType::Rsa4096,
            bits => return Err(Pkcs15Error::UnsupportedKey(format!("RSA {bits}-bit"))),
        };
        if &p * &q != n {
            return Err(Pkcs15Error::InvalidKey("primes do not multiply to the modulus".into()));
        }
        let crt = CrtParams::derive(d, &p, &q)
            .ok_or_else(|| Pkcs15Error::InvalidKey("q is not invertible modulo p".into()))?;

        Ok(RsaKey {
            n,
            e,
            p,
            q,
            crt,
            key_type,
        })
    }
}

/// Named curves the firmware accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EcCurve {
    #[allow(missing_docs)]
    P256,
    #[allow(missing_docs)]
    P384,
    #[allow(missing_docs)]
    P521,
}

impl EcCurve {
    #[allow(missing_docs)]
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            EcCurve::P256 => oid::PRIME256V1,
            EcCurve::P384 => oid::SECP384R1,
            EcCurve::P521 => oid::SECP521R1,
        }
    }

    #[allow(missing_docs)]
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [EcCurve::P256, EcCurve::P384, EcCurve::P521]
            .into_iter()
            .find(|curve| curve.oid() == *oid)
    }
}

/// An ECDSA key on one of the supported curves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcKey {
    #[allow(missing_docs)]
    pub curve: EcCurve,
    /// Private scalar `d`.
    pub scalar: BigUint,
    /// Public point in uncompressed SEC1 form.
    pub public_point: Vec<u8>,
}

/// Key classification used for compatibility decisions and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    /// RSA with a 1024-bit modulus.
    Rsa1024,
    /// RSA with a 2048-bit modulus.
    Rsa2048,
    /// RSA with a 3072-bit modulus.
    Rsa3072,
    /// RSA with a 4096-bit modulus.
    Rsa4096,
    /// ECDSA on NIST P-256.
    EcP256,
    /// ECDSA on NIST P-384.
    EcP384,
    /// ECDSA on NIST P-521.
    EcP521,
}

impl KeyType {
    /// Whether NMC2 firmware can load this key. RSA 3072 is not officially supported but works.
    pub fn is_nmc2_supported(self) -> bool {
        matches!(self, KeyType::Rsa1024 | KeyType::Rsa2048 | KeyType::Rsa3072)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Rsa1024 => "RSA 1024-bit",
            KeyType::Rsa2048 => "RSA 2048-bit",
            KeyType::Rsa3072 => "RSA 3072-bit",
            KeyType::Rsa4096 => "RSA 4096-bit",
            KeyType::EcP256 => "ECDSA P-256",
            KeyType::EcP384 => "ECDSA P-384",
            KeyType::EcP521 => "ECDSA P-521",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_rsa() -> (BigUint, BigUint, BigUint, BigUint, BigUint) {
        // p = 61, q = 53, e = 17, d = 2753
        (
            BigUint::from(3233u32),
            BigUint::from(17u32),
            BigUint::from(2753u32),
            BigUint::from(61u32),
            BigUint::from(53u32),
        )
    }

    #[test]
    fn test_crt_params() {
        let (_, _, d, p, q) = small_rsa();
        let crt = CrtParams::derive(&d, &p, &q).unwrap();
        assert_eq!(crt.dp, BigUint::from(53u32));
        assert_eq!(crt.dq, BigUint::from(49u32));
        assert_eq!(crt.qinv, BigUint::from(38u32));
    }

    #[test]
    fn test_crt_params_reject_non_invertible() {
        let d = BigUint::from(5u32);
        assert!(CrtParams::derive(&d, &BigUint::from(6u32), &BigUint::from(4u32)).is_none());
        assert!(CrtParams::derive(&d, &BigUint::from(1u32), &BigUint::from(4u32)).is_none());
    }

    #[test]
    fn test_rsa_key_rejects_unsupported_size() {
        let (n, e, d, p, q) = small_rsa();
        assert!(matches!(
            RsaKey::new(n, e, &d, p, q),
            Err(Pkcs15Error::UnsupportedKey(msg)) if msg == "RSA 12-bit"
        ));
    }

    #[test]
    fn test_ec_plaintext_is_bare_integer() {
        let key = PrivateKey::Ec(EcKey {
            curve: EcCurve::P256,
            scalar: BigUint::from(0x80u32),
            public_point: vec![4],
        });
        assert_eq!(key.plaintext_object(), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(key.key_type(), KeyType::EcP256);
    }

    #[test]
    fn test_curve_from_oid() {
        assert_eq!(EcCurve::from_oid(&oid::SECP521R1), Some(EcCurve::P521));
        assert_eq!(EcCurve::from_oid(&oid::RSA_ENCRYPTION), None);
    }

    #[test]
    fn test_key_type_display_and_nmc2() {
        assert_eq!(KeyType::Rsa3072.to_string(), "RSA 3072-bit");
        assert_eq!(KeyType::EcP384.to_string(), "ECDSA P-384");
        assert!(KeyType::Rsa3072.is_nmc2_supported());
        assert!(!KeyType::Rsa4096.is_nmc2_supported());
        assert!(!KeyType::EcP256.is_nmc2_supported());
    }
}
