//! HID report descriptor short-item decoding primitives.
//!
//! This crate is intentionally small and I/O-free so descriptor-consuming
//! crates can reuse capture-validated item decoding without pulling in any
//! runtime concerns. It covers the byte-level grammar only: splitting a
//! prefix byte into size class / type / tag, assembling the little-endian
//! payload (tolerating truncated trailing items), and interpreting payloads
//! as signed or unsigned integers of their declared width.

/// Item type encoded in bits 2..4 of the prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Main,
    Global,
    Local,
    Reserved,
}

impl ItemType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ItemType::Main,
            1 => ItemType::Global,
            2 => ItemType::Local,
            _ => ItemType::Reserved,
        }
    }
}

/// Main item tags.
pub mod main_tag {
    pub const INPUT: u8 = 0x08;
    pub const OUTPUT: u8 = 0x09;
    pub const COLLECTION: u8 = 0x0A;
    pub const FEATURE: u8 = 0x0B;
    pub const END_COLLECTION: u8 = 0x0C;
}

/// Global item tags.
pub mod global_tag {
    pub const USAGE_PAGE: u8 = 0x00;
    pub const LOGICAL_MINIMUM: u8 = 0x01;
    pub const LOGICAL_MAXIMUM: u8 = 0x02;
    pub const PHYSICAL_MINIMUM: u8 = 0x03;
    pub const PHYSICAL_MAXIMUM: u8 = 0x04;
    pub const UNIT_EXPONENT: u8 = 0x05;
    pub const UNIT: u8 = 0x06;
    pub const REPORT_SIZE: u8 = 0x07;
    pub const REPORT_ID: u8 = 0x08;
    pub const REPORT_COUNT: u8 = 0x09;
    pub const PUSH: u8 = 0x0A;
    pub const POP: u8 = 0x0B;
}

/// Local item tags.
pub mod local_tag {
    pub const USAGE: u8 = 0x00;
    pub const USAGE_MINIMUM: u8 = 0x01;
    pub const USAGE_MAXIMUM: u8 = 0x02;
    pub const DESIGNATOR_INDEX: u8 = 0x03;
    pub const DESIGNATOR_MINIMUM: u8 = 0x04;
    pub const DESIGNATOR_MAXIMUM: u8 = 0x05;
    pub const STRING_INDEX: u8 = 0x06;
    pub const STRING_MINIMUM: u8 = 0x07;
    pub const STRING_MAXIMUM: u8 = 0x08;
    pub const DELIMITER: u8 = 0x09;
}

/// Tag reserved for the long-item encoding.
pub const LONG_ITEM_TAG: u8 = 0x0F;

/// One decoded short item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub item_type: ItemType,
    pub tag: u8,
    /// Declared payload width in bytes (0, 1, 2 or 4).
    pub payload_len: u8,
    /// Little-endian composition of the payload bytes actually present in
    /// the buffer. Bytes past the buffer end read as absent, not as zero
    /// fill, so a truncated trailing item yields the partial value.
    pub raw: u32,
    /// Cursor position of the item following this one. May point past the
    /// buffer end for a truncated trailing item.
    pub next: usize,
}

/// Result of decoding at a cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Item(Item),
    /// Long-item encoding (Reserved type, tag 0x0F, 2-byte size class, with
    /// a length/tag pair before buffer end). Nothing ships these; callers
    /// report and resume at `next`, which skips the prefix byte only.
    LongItem { next: usize },
}

/// Decode one item at `pos`. Returns `None` when `pos` is at or past the
/// buffer end.
pub fn decode_item(descriptor: &[u8], pos: usize) -> Option<Decoded> {
    let prefix = *descriptor.get(pos)?;
    let size_class = prefix & 0x03;
    let item_type = ItemType::from_bits((prefix >> 2) & 0x03);
    let tag = (prefix >> 4) & 0x0F;
    // Size class 3 declares a 4-byte payload.
    let payload_len = if size_class == 3 { 4 } else { size_class };

    let body = pos + 1;
    if item_type == ItemType::Reserved
        && tag == LONG_ITEM_TAG
        && payload_len == 2
        && body + 2 < descriptor.len()
    {
        return Some(Decoded::LongItem { next: body });
    }

    let mut raw = 0u32;
    for offset in 0..usize::from(payload_len) {
        if let Some(&byte) = descriptor.get(body + offset) {
            raw |= u32::from(byte) << (8 * offset);
        }
    }

    Some(Decoded::Item(Item {
        item_type,
        tag,
        payload_len,
        raw,
        next: body + usize::from(payload_len),
    }))
}

fn width_mask(payload_len: u8) -> u32 {
    // Only called for widths 1..=3; 4-byte payloads need no masking.
    (1u32 << (8 * u32::from(payload_len))) - 1
}

/// Interpret a raw payload as an unsigned integer of its declared width.
pub fn unsigned_value(payload_len: u8, raw: u32) -> u32 {
    match payload_len {
        0 => 0,
        4.. => raw,
        n => raw & width_mask(n),
    }
}

/// Interpret a raw payload as a signed integer, extending the sign bit of
/// the declared width through the unused high bits.
pub fn signed_value(payload_len: u8, raw: u32) -> i32 {
    match payload_len {
        0 => 0,
        4.. => raw as i32,
        n => {
            let mask = width_mask(n);
            let value = raw & mask;
            let sign = 1u32 << (8 * u32::from(n) - 1);
            if value & sign != 0 {
                (value | !mask) as i32
            } else {
                value as i32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_at(bytes: &[u8], pos: usize) -> Item {
        match decode_item(bytes, pos) {
            Some(Decoded::Item(item)) => item,
            other => panic!("expected short item at {pos}, got {other:?}"),
        }
    }

    #[test]
    fn decode_zero_size_item() {
        // 0xC0 = End Collection: tag 0xC, type Main, size 0
        let item = item_at(&[0xC0], 0);
        assert_eq!(item.item_type, ItemType::Main);
        assert_eq!(item.tag, main_tag::END_COLLECTION);
        assert_eq!(item.payload_len, 0);
        assert_eq!(item.raw, 0);
        assert_eq!(item.next, 1);
    }

    #[test]
    fn decode_one_byte_global() {
        // 0x05 0x01 = Usage Page (Generic Desktop)
        let item = item_at(&[0x05, 0x01], 0);
        assert_eq!(item.item_type, ItemType::Global);
        assert_eq!(item.tag, global_tag::USAGE_PAGE);
        assert_eq!(item.payload_len, 1);
        assert_eq!(item.raw, 0x01);
        assert_eq!(item.next, 2);
    }

    #[test]
    fn decode_two_byte_local_little_endian() {
        // 0x0A 0x34 0x12 = Usage 0x1234
        let item = item_at(&[0x0A, 0x34, 0x12], 0);
        assert_eq!(item.item_type, ItemType::Local);
        assert_eq!(item.tag, local_tag::USAGE);
        assert_eq!(item.payload_len, 2);
        assert_eq!(item.raw, 0x1234);
        assert_eq!(item.next, 3);
    }

    #[test]
    fn decode_size_class_three_reads_four_bytes() {
        // 0x17 = Logical Minimum, size class 3 -> 4 bytes
        let item = item_at(&[0x17, 0x78, 0x56, 0x34, 0x12], 0);
        assert_eq!(item.payload_len, 4);
        assert_eq!(item.raw, 0x1234_5678);
        assert_eq!(item.next, 5);
    }

    #[test]
    fn truncated_payload_reads_available_bytes() {
        // 2-byte payload declared, one byte present
        let item = item_at(&[0x0A, 0x34], 0);
        assert_eq!(item.payload_len, 2);
        assert_eq!(item.raw, 0x34);
        assert_eq!(item.next, 3);
    }

    #[test]
    fn decode_past_end_returns_none() {
        assert_eq!(decode_item(&[], 0), None);
        assert_eq!(decode_item(&[0x05, 0x01], 2), None);
    }

    #[test]
    fn long_item_recognized_with_room_for_length_and_tag() {
        // 0xFE = Reserved type, tag 0xF, size class 2
        let bytes = [0xFE, 0x02, 0x01, 0x00, 0x00];
        assert_eq!(decode_item(&bytes, 0), Some(Decoded::LongItem { next: 1 }));
    }

    #[test]
    fn long_item_prefix_at_buffer_end_decodes_as_short_item() {
        // No room for a length/tag pair: falls back to a Reserved short item.
        let bytes = [0xFE, 0x02, 0x01];
        let item = item_at(&bytes, 0);
        assert_eq!(item.item_type, ItemType::Reserved);
        assert_eq!(item.tag, LONG_ITEM_TAG);
        assert_eq!(item.payload_len, 2);
        assert_eq!(item.raw, 0x0102);
    }

    #[test]
    fn unsigned_value_masks_to_declared_width() {
        assert_eq!(unsigned_value(0, 0xFFFF_FFFF), 0);
        assert_eq!(unsigned_value(1, 0x1FF), 0xFF);
        assert_eq!(unsigned_value(2, 0xFFFF_FFFF), 0xFFFF);
        assert_eq!(unsigned_value(4, 0xFFFF_FFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn signed_value_sign_extends_narrow_widths() {
        assert_eq!(signed_value(1, 0x81), -127);
        assert_eq!(signed_value(1, 0x7F), 127);
        assert_eq!(signed_value(2, 0x8000), -32768);
        assert_eq!(signed_value(2, 0x7FFF), 32767);
        assert_eq!(signed_value(4, 0xFFFF_FFFF), -1);
        assert_eq!(signed_value(0, 0xFF), 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_signed_one_byte_matches_i8(byte in 0u8..=255u8) {
            prop_assert_eq!(signed_value(1, u32::from(byte)), i32::from(byte as i8));
        }

        #[test]
        fn prop_signed_two_byte_matches_i16(lo in 0u8..=255u8, hi in 0u8..=255u8) {
            let raw = u32::from(u16::from_le_bytes([lo, hi]));
            let expected = i32::from(i16::from_le_bytes([lo, hi]));
            prop_assert_eq!(signed_value(2, raw), expected);
        }

        #[test]
        fn prop_decode_never_reads_past_declared_width(
            prefix in 0u8..=255u8,
            body in proptest::collection::vec(0u8..=255u8, 0..6),
        ) {
            let mut bytes = vec![prefix];
            bytes.extend_from_slice(&body);
            if let Some(Decoded::Item(item)) = decode_item(&bytes, 0) {
                prop_assert!(item.next >= 1);
                prop_assert!(item.next <= 1 + usize::from(item.payload_len));
                // next is computed from the declared width even when truncated
                prop_assert_eq!(item.next, 1 + usize::from(item.payload_len));
            }
        }
    }
}
