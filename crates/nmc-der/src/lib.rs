#![doc = include_str!("../README.md")]

mod constructed;
pub use constructed::{explicit_compound, explicit_value, sequence, set};
mod primitive;
pub use primitive::{
    bit_string, generalized_time, generalized_time_explicit_value, generalized_time_value, integer,
    integer_explicit_value, integer_from_u64, null, object_identifier, octet_string, utf8_string,
};
pub mod oid;
mod tlv;
pub use tlv::{Tag, encode_tlv};
