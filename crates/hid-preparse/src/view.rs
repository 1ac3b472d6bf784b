//! Read-side access to a serialized layout blob.
//!
//! A [`LayoutView`] borrows the raw bytes and walks them the way a report
//! decoder would: report records are located by accumulating each record's
//! own size field, elements by the count stored in their record. The blob is
//! position-independent, so a view works on any copy of the bytes.

use thiserror::Error;

use crate::blob::{
    ELEMENT_KIND_BUTTON, ELEMENT_KIND_VALUE, ELEMENT_LEN, HEADER_LEN, LAYOUT_MAGIC, REPORT_LEN,
    element_record, header, report_record,
};
use crate::compile::{ButtonCaps, Element, ElementCaps, Selector, ValueCaps};
use crate::tree::Direction;

/// Validation failures when opening or walking a layout blob.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout blob too short: {len} bytes, header needs {HEADER_LEN}")]
    TooShort { len: usize },

    #[error("layout magic mismatch")]
    BadMagic,

    #[error("header total size {declared} does not match blob length {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    #[error("record at offset {offset} extends past the blob end")]
    TruncatedRecord { offset: usize },

    #[error("unknown element kind {kind} at offset {offset}")]
    UnknownElementKind { kind: u8, offset: usize },
}

/// Borrowing reader over a serialized layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutView<'a> {
    bytes: &'a [u8],
}

/// One report record located within the blob.
#[derive(Debug, Clone, Copy)]
pub struct ReportRecord<'a> {
    pub report_id: u8,
    /// Record byte size including elements; displacement to the next record.
    pub size: u32,
    pub element_count: u32,
    bytes: &'a [u8],
}

impl<'a> LayoutView<'a> {
    /// Open a blob, validating magic and size bookkeeping.
    pub fn new(bytes: &'a [u8]) -> Result<Self, LayoutError> {
        if bytes.len() < HEADER_LEN {
            return Err(LayoutError::TooShort { len: bytes.len() });
        }
        if bytes[header::MAGIC..header::MAGIC + 4] != LAYOUT_MAGIC {
            return Err(LayoutError::BadMagic);
        }
        let view = LayoutView { bytes };
        let declared = view.total_size();
        if declared as usize != bytes.len() {
            return Err(LayoutError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        Ok(view)
    }

    /// Wrap bytes this crate just produced, skipping validation.
    pub(crate) fn trusted(bytes: &'a [u8]) -> Self {
        LayoutView { bytes }
    }

    fn u16_at(&self, at: usize) -> u16 {
        match self.bytes.get(at..at + 2) {
            Some([lo, hi]) => u16::from_le_bytes([*lo, *hi]),
            _ => 0,
        }
    }

    fn u32_at(&self, at: usize) -> u32 {
        match self.bytes.get(at..at + 4) {
            Some([b0, b1, b2, b3]) => u32::from_le_bytes([*b0, *b1, *b2, *b3]),
            _ => 0,
        }
    }

    pub fn total_size(&self) -> u32 {
        self.u32_at(header::TOTAL_SIZE)
    }

    pub fn device_usage(&self) -> u16 {
        self.u16_at(header::USAGE)
    }

    pub fn device_usage_page(&self) -> u16 {
        self.u16_at(header::USAGE_PAGE)
    }

    /// Longest report of a direction in whole bytes, id byte included.
    pub fn report_byte_length(&self, direction: Direction) -> u16 {
        self.u16_at(match direction {
            Direction::Input => header::INPUT_BYTE_LENGTH,
            Direction::Output => header::OUTPUT_BYTE_LENGTH,
            Direction::Feature => header::FEATURE_BYTE_LENGTH,
        })
    }

    pub fn button_count(&self, direction: Direction) -> u16 {
        self.u16_at(match direction {
            Direction::Input => header::INPUT_BUTTON_COUNT,
            Direction::Output => header::OUTPUT_BUTTON_COUNT,
            Direction::Feature => header::FEATURE_BUTTON_COUNT,
        })
    }

    pub fn value_count(&self, direction: Direction) -> u16 {
        self.u16_at(match direction {
            Direction::Input => header::INPUT_VALUE_COUNT,
            Direction::Output => header::OUTPUT_VALUE_COUNT,
            Direction::Feature => header::FEATURE_VALUE_COUNT,
        })
    }

    pub fn report_count(&self, direction: Direction) -> u32 {
        self.u32_at(match direction {
            Direction::Input => header::INPUT_REPORT_COUNT,
            Direction::Output => header::OUTPUT_REPORT_COUNT,
            Direction::Feature => header::FEATURE_REPORT_COUNT,
        })
    }

    fn section_start(&self, direction: Direction) -> usize {
        let offset = match direction {
            Direction::Input => 0,
            Direction::Output => self.u32_at(header::OUTPUT_SECTION_OFFSET) as usize,
            Direction::Feature => self.u32_at(header::FEATURE_SECTION_OFFSET) as usize,
        };
        HEADER_LEN + offset
    }

    /// Walk the report records of one direction in serialized order.
    pub fn reports(&self, direction: Direction) -> Result<Vec<ReportRecord<'a>>, LayoutError> {
        let count = self.report_count(direction);
        // Counts come from untrusted bytes; size the allocation lazily.
        let mut records = Vec::with_capacity((count as usize).min(64));
        let mut offset = self.section_start(direction);

        for _ in 0..count {
            let bytes = self
                .bytes
                .get(offset..)
                .filter(|rest| rest.len() >= REPORT_LEN)
                .ok_or(LayoutError::TruncatedRecord { offset })?;

            let record = ReportRecord {
                report_id: bytes[report_record::REPORT_ID],
                size: u32::from_le_bytes([
                    bytes[report_record::SIZE],
                    bytes[report_record::SIZE + 1],
                    bytes[report_record::SIZE + 2],
                    bytes[report_record::SIZE + 3],
                ]),
                element_count: u32::from_le_bytes([
                    bytes[report_record::ELEMENT_COUNT],
                    bytes[report_record::ELEMENT_COUNT + 1],
                    bytes[report_record::ELEMENT_COUNT + 2],
                    bytes[report_record::ELEMENT_COUNT + 3],
                ]),
                bytes,
            };
            if (record.size as usize) < REPORT_LEN || record.size as usize > bytes.len() {
                return Err(LayoutError::TruncatedRecord { offset });
            }
            offset += record.size as usize;
            records.push(record);
        }
        Ok(records)
    }
}

impl ReportRecord<'_> {
    /// Decode the element records that follow this report record.
    pub fn elements(&self) -> Result<Vec<Element>, LayoutError> {
        let mut elements = Vec::with_capacity((self.element_count as usize).min(64));
        for index in 0..self.element_count as usize {
            let offset = REPORT_LEN + index * ELEMENT_LEN;
            let bytes = self
                .bytes
                .get(offset..offset + ELEMENT_LEN)
                .ok_or(LayoutError::TruncatedRecord { offset })?;
            elements.push(decode_element(bytes, offset)?);
        }
        Ok(elements)
    }
}

fn u16_field(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_field(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn i32_field(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn decode_element(bytes: &[u8], offset: usize) -> Result<Element, LayoutError> {
    use element_record as rec;

    let selector = Selector {
        is_range: bytes[rec::IS_RANGE] != 0,
        is_string_range: bytes[rec::IS_STRING_RANGE] != 0,
        is_designator_range: bytes[rec::IS_DESIGNATOR_RANGE] != 0,
        usage_min: u16_field(bytes, rec::USAGE_MIN),
        usage_max: u16_field(bytes, rec::USAGE_MAX),
        string_min: u16_field(bytes, rec::STRING_MIN),
        string_max: u16_field(bytes, rec::STRING_MAX),
        designator_min: u16_field(bytes, rec::DESIGNATOR_MIN),
        designator_max: u16_field(bytes, rec::DESIGNATOR_MAX),
    };

    let caps = match bytes[rec::KIND] {
        ELEMENT_KIND_BUTTON => ElementCaps::Button(ButtonCaps {
            usage_page: u16_field(bytes, rec::USAGE_PAGE),
            report_id: bytes[rec::REPORT_ID],
            bit_field: bytes[rec::BIT_FIELD] != 0,
            is_absolute: bytes[rec::IS_ABSOLUTE] != 0,
            selector,
        }),
        ELEMENT_KIND_VALUE => ElementCaps::Value(ValueCaps {
            usage_page: u16_field(bytes, rec::USAGE_PAGE),
            report_id: bytes[rec::REPORT_ID],
            bit_field: bytes[rec::BIT_FIELD] != 0,
            is_absolute: bytes[rec::IS_ABSOLUTE] != 0,
            has_null: bytes[rec::HAS_NULL] != 0,
            bit_size: u16_field(bytes, rec::BIT_SIZE),
            report_count: u16_field(bytes, rec::REPORT_COUNT),
            unit_exponent: i32_field(bytes, rec::UNIT_EXPONENT),
            unit: i32_field(bytes, rec::UNIT),
            logical_min: i32_field(bytes, rec::LOGICAL_MIN),
            logical_max: i32_field(bytes, rec::LOGICAL_MAX),
            physical_min: i32_field(bytes, rec::PHYSICAL_MIN),
            physical_max: i32_field(bytes, rec::PHYSICAL_MAX),
            selector,
        }),
        kind => return Err(LayoutError::UnknownElementKind { kind, offset }),
    };

    Ok(Element {
        start_bit: u32_field(bytes, rec::START_BIT),
        bit_count: u32_field(bytes, rec::BIT_COUNT),
        caps,
    })
}
