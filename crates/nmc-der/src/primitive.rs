use chrono::{DateTime, Datelike, Offset, TimeZone, Timelike};
use const_oid::ObjectIdentifier;
use num_bigint::BigUint;

use crate::{
    constructed::explicit_value,
    tlv::{Tag, encode_tlv},
};

/// `INTEGER` holding a non-negative big integer in minimal two's complement form.
pub fn integer(value: &BigUint) -> Vec<u8> {
    encode_tlv(Tag::INTEGER, &integer_content(&value.to_bytes_be()))
}

/// `INTEGER` for small constants such as versions and key ID types.
pub fn integer_from_u64(value: u64) -> Vec<u8> {
    encode_tlv(Tag::INTEGER, &integer_content(&value.to_be_bytes()))
}

/// The value octets of an `INTEGER` re-tagged as context-specific primitive `[tag_number]`.
pub fn integer_explicit_value(tag_number: u8, value: &BigUint) -> Vec<u8> {
    explicit_value(tag_number, &integer_content(&value.to_bytes_be()))
}

/// Minimal content octets for a non-negative big-endian magnitude.
fn integer_content(magnitude: &[u8]) -> Vec<u8> {
    let skip = magnitude.iter().take_while(|b| **b == 0).count();
    let significant = &magnitude[skip..];

    match significant.first() {
        None => vec![0],
        // keep the value positive
        Some(first) if first & 0x80 != 0 => {
            let mut content = Vec::with_capacity(significant.len() + 1);
            content.push(0);
            content.extend_from_slice(significant);
            content
        }
        Some(_) => significant.to_vec(),
    }
}

/// `OCTET STRING`
pub fn octet_string(content: &[u8]) -> Vec<u8> {
    encode_tlv(Tag::OCTET_STRING, content)
}

/// `BIT STRING` over whole bytes.
///
/// Trailing zero bits of the final byte are dropped from the bit length (reported through the
/// unused-bits octet) while the byte buffer itself is kept intact. An empty input yields an
/// empty bit string.
pub fn bit_string(content: &[u8]) -> Vec<u8> {
    let bit_length = match content.last() {
        Some(last) => 8 * content.len() - last.trailing_zeros() as usize,
        None => 0,
    };
    let unused_bits = ((8 - bit_length % 8) % 8) as u8;

    let mut value = Vec::with_capacity(content.len() + 1);
    value.push(unused_bits);
    value.extend_from_slice(content);
    encode_tlv(Tag::BIT_STRING, &value)
}

/// `NULL`
pub fn null() -> Vec<u8> {
    encode_tlv(Tag::NULL, &[])
}

/// `OBJECT IDENTIFIER`
pub fn object_identifier(oid: &ObjectIdentifier) -> Vec<u8> {
    encode_tlv(Tag::OBJECT_IDENTIFIER, oid.as_bytes())
}

/// `UTF8String`
pub fn utf8_string(value: &str) -> Vec<u8> {
    encode_tlv(Tag::UTF8_STRING, value.as_bytes())
}

/// `GeneralizedTime` with the universal tag.
pub fn generalized_time<Tz: TimeZone>(time: &DateTime<Tz>) -> Vec<u8> {
    encode_tlv(Tag::GENERALIZED_TIME, &generalized_time_value(time))
}

/// GeneralizedTime body tagged as context-specific primitive `[tag_number]` instead of with
/// the universal GeneralizedTime tag.
pub fn generalized_time_explicit_value<Tz: TimeZone>(
    tag_number: u8,
    time: &DateTime<Tz>,
) -> Vec<u8> {
    explicit_value(tag_number, &generalized_time_value(time))
}

/// `YYYYMMDDHHMMSS` followed by `Z` for UTC, or `+hhmm` / `-hhmm` for other offsets.
///
/// # Panics
///
/// When the year can not be written with four digits.
pub fn generalized_time_value<Tz: TimeZone>(time: &DateTime<Tz>) -> Vec<u8> {
    let year = time.year();
    assert!(
        (0..=9999).contains(&year),
        "cannot represent year {year} as GeneralizedTime"
    );

    let mut value = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        year,
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    );

    let offset_minutes = time.offset().fix().local_minus_utc() / 60;
    if offset_minutes == 0 {
        value.push('Z');
    } else {
        let sign = if offset_minutes > 0 { '+' } else { '-' };
        let offset_minutes = offset_minutes.abs();
        value.push(sign);
        value.push_str(&format!("{:02}{:02}", offset_minutes / 60, offset_minutes % 60));
    }

    value.into_bytes()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::oid;

    #[test]
    fn test_integer_minimal_encoding() {
        assert_eq!(integer_from_u64(0), [0x02, 0x01, 0x00]);
        assert_eq!(integer_from_u64(2), [0x02, 0x01, 0x02]);
        assert_eq!(integer_from_u64(127), [0x02, 0x01, 0x7f]);
        assert_eq!(integer_from_u64(128), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(integer_from_u64(5000), [0x02, 0x02, 0x13, 0x88]);
        assert_eq!(integer_from_u64(65537), [0x02, 0x03, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_big_integer_encoding() {
        let value = BigUint::from_bytes_be(&[0xff, 0x00, 0x01]);
        assert_eq!(integer(&value), [0x02, 0x04, 0x00, 0xff, 0x00, 0x01]);
        assert_eq!(integer(&BigUint::from(0u8)), [0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_integer_explicit_value_strips_universal_header() {
        let value = BigUint::from_bytes_be(&[0x80, 0x01]);
        assert_eq!(integer_explicit_value(3, &value), [0x83, 0x03, 0x00, 0x80, 0x01]);
    }

    #[test]
    fn test_bit_string_drops_trailing_zero_bits() {
        // usage flags 0b11100010: one trailing zero bit
        assert_eq!(bit_string(&[0b1110_0010]), [0x03, 0x02, 0x01, 0xe2]);
        // access flags 0b10110000: four trailing zero bits
        assert_eq!(bit_string(&[0b1011_0000]), [0x03, 0x02, 0x04, 0xb0]);
        assert_eq!(bit_string(&[0b0100_0000]), [0x03, 0x02, 0x06, 0x40]);
        assert_eq!(bit_string(&[0xaa, 0x01]), [0x03, 0x03, 0x00, 0xaa, 0x01]);
    }

    #[test]
    fn test_bit_string_keeps_zero_final_byte() {
        assert_eq!(bit_string(&[0x04, 0x00]), [0x03, 0x03, 0x00, 0x04, 0x00]);
    }

    #[test]
    fn test_empty_bit_string() {
        assert_eq!(bit_string(&[]), [0x03, 0x01, 0x00]);
    }

    #[test]
    fn test_object_identifier() {
        assert_eq!(
            hex::encode(object_identifier(&oid::PKCS15_CONTENT)),
            "06092a864886f70d010f0301"
        );
        assert_eq!(hex::encode(object_identifier(&oid::SECP384R1)), "06052b81040022");
    }

    #[test]
    fn test_utf8_string() {
        assert_eq!(
            utf8_string("Private key"),
            [&[0x0c_u8, 0x0b][..], &b"Private key"[..]].concat()
        );
    }

    #[test]
    fn test_generalized_time_utc() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(generalized_time_value(&time), b"20240101000000Z");

        let encoded = generalized_time(&time);
        assert_eq!(encoded[..2], [0x18, 0x0f]);
        assert_eq!(&encoded[2..], b"20240101000000Z");
    }

    #[test]
    fn test_generalized_time_explicit_value() {
        let time = Utc.with_ymd_and_hms(2034, 1, 1, 12, 30, 5).unwrap();
        let encoded = generalized_time_explicit_value(4, &time);
        assert_eq!(encoded[..2], [0x84, 0x0f]);
        assert_eq!(&encoded[2..], b"20340101123005Z");
    }

    #[test]
    fn test_generalized_time_offset() {
        let offset = FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap();
        let time = offset.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        assert_eq!(generalized_time_value(&time), b"20240601080000-0530");
    }

    #[test]
    fn test_null() {
        assert_eq!(null(), [0x05, 0x00]);
    }
}
