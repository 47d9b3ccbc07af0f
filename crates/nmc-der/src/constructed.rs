use crate::tlv::{Tag, encode_tlv};

fn concat<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    children.into_iter().fold(Vec::new(), |mut acc, child| {
        acc.extend_from_slice(child.as_ref());
        acc
    })
}

/// `SEQUENCE` over already encoded children, kept in the given order.
pub fn sequence<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    encode_tlv(Tag::SEQUENCE, &concat(children))
}

/// `SET` over already encoded children.
///
/// Children are NOT sorted. Every `SET` built by this tool carries a single element, so the
/// DER ordering rule is satisfied trivially.
pub fn set<I, T>(children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    encode_tlv(Tag::SET, &concat(children))
}

/// Context-specific constructed tag `[tag_number]` wrapping already encoded children.
pub fn explicit_compound<I, T>(tag_number: u8, children: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    encode_tlv(Tag::context_constructed(tag_number), &concat(children))
}

/// Context-specific primitive tag `[tag_number]` holding raw value octets.
///
/// Not interchangeable with [`explicit_compound`]: the constructed bit differs, and the
/// firmware parser checks it.
pub fn explicit_value(tag_number: u8, value: &[u8]) -> Vec<u8> {
    encode_tlv(Tag::context_primitive(tag_number), value)
}
