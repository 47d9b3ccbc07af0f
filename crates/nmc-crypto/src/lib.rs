#![doc = include_str!("../README.md")]

mod ensure;
mod envelope;
pub use envelope::{Envelope, derive_kek};
mod error;
pub use error::EnvelopeError;
mod key_wrap;
pub use key_wrap::{encrypt_wrapped_cek, format_wrapped_cek, unwrap_cek, wrap_cek};
mod profile;
pub use profile::DeviceProfile;
mod tdes;
mod util;
pub use util::generate_random_bytes;

/// 3DES key length (k1, k2, k3). Used for the KEK and the content key.
pub const KEK_SIZE: usize = 24;
/// CEK length mandated by authEnc128.
pub const CEK_SIZE: usize = 16;
/// Every salt and IV in the envelope is one 3DES block.
pub const SALT_SIZE: usize = 8;
/// Length of the wrapped CEK for a 16 byte CEK.
pub const ENCRYPTED_CEK_SIZE: usize = 24;
/// HMAC-SHA256 output length.
pub const MAC_SIZE: usize = 32;
