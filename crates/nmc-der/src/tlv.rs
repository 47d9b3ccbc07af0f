/// Identifier octets used by the encoders in this crate.
///
/// Only low tag numbers (0..=30) are supported, which covers every universal tag used here and
/// the context-specific tags of the PKCS#15 and CMS structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag(u8);

const CLASS_CONTEXT_SPECIFIC: u8 = 0x80;
const CONSTRUCTED: u8 = 0x20;
const MAX_LOW_TAG_NUMBER: u8 = 30;

impl Tag {
    #[allow(missing_docs)]
    pub const INTEGER: Tag = Tag(0x02);
    #[allow(missing_docs)]
    pub const BIT_STRING: Tag = Tag(0x03);
    #[allow(missing_docs)]
    pub const OCTET_STRING: Tag = Tag(0x04);
    #[allow(missing_docs)]
    pub const NULL: Tag = Tag(0x05);
    #[allow(missing_docs)]
    pub const OBJECT_IDENTIFIER: Tag = Tag(0x06);
    #[allow(missing_docs)]
    pub const UTF8_STRING: Tag = Tag(0x0c);
    #[allow(missing_docs)]
    pub const GENERALIZED_TIME: Tag = Tag(0x18);
    #[allow(missing_docs)]
    pub const SEQUENCE: Tag = Tag(0x30);
    #[allow(missing_docs)]
    pub const SET: Tag = Tag(0x31);

    /// Context-specific, constructed tag `[number]`.
    pub fn context_constructed(number: u8) -> Tag {
        Tag(CLASS_CONTEXT_SPECIFIC | CONSTRUCTED | Self::low_tag_number(number))
    }

    /// Context-specific, primitive tag `[number]`.
    pub fn context_primitive(number: u8) -> Tag {
        Tag(CLASS_CONTEXT_SPECIFIC | Self::low_tag_number(number))
    }

    /// The single identifier octet.
    pub fn octet(self) -> u8 {
        self.0
    }

    fn low_tag_number(number: u8) -> u8 {
        assert!(
            number <= MAX_LOW_TAG_NUMBER,
            "tag number {number} requires the high tag number form"
        );
        number
    }
}

/// Encode `value` under `tag` using definite length, choosing the short form when possible.
pub fn encode_tlv(tag: Tag, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 6);
    out.push(tag.octet());
    push_length(&mut out, value.len());
    out.extend_from_slice(value);
    out
}

fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}
