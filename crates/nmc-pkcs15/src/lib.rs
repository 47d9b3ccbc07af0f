#![doc = include_str!("../README.md")]

mod certificate;
pub use certificate::{Certificate, CertificateExtension};
mod compat;
pub use compat::{CompatibilityWarning, check_compatibility};
mod container;
pub use container::KEY_LABEL;
mod convert;
pub use convert::{Conversion, convert, convert_pair};
mod error;
pub use error::Pkcs15Error;
mod header;
pub use header::{FileHeader, HEADER_LEN, TOOL_NAME, crc16_xmodem, with_header};
mod key;
pub use key::{CrtParams, EcCurve, EcKey, KeyType, PrivateKey, RsaKey};
pub mod key_id;
mod pair;
pub use pair::KeyCertPair;
pub mod pem;

pub use nmc_crypto::DeviceProfile;
