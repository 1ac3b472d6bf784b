//! Serialization of a compiled layout into one contiguous blob.
//!
//! The blob is position-independent: the header records section offsets as
//! byte displacements from the start of the record area, and every report
//! record carries its own size so a consumer can hop to the next one. All
//! multi-byte fields are little-endian and records are packed without
//! implicit padding; the exact offsets live in the `header`,
//! `report_record` and `element_record` modules.

use crate::compile::{CompiledLayout, Element, ElementCaps, Report};
use crate::tree::Direction;

/// Magic tag opening every layout blob.
pub const LAYOUT_MAGIC: [u8; 4] = *b"HRL1";

/// Header length in bytes.
pub const HEADER_LEN: usize = 50;

/// Report record length in bytes, excluding its elements.
pub const REPORT_LEN: usize = 9;

/// Fixed element record length in bytes, shared by both kinds.
pub const ELEMENT_LEN: usize = 58;

pub const ELEMENT_KIND_BUTTON: u8 = 0;
pub const ELEMENT_KIND_VALUE: u8 = 1;

/// Header field offsets from the start of the blob.
pub mod header {
    pub const MAGIC: usize = 0;
    pub const TOTAL_SIZE: usize = 4;
    pub const USAGE: usize = 8;
    pub const USAGE_PAGE: usize = 10;
    pub const INPUT_BYTE_LENGTH: usize = 12;
    pub const OUTPUT_BYTE_LENGTH: usize = 14;
    pub const FEATURE_BYTE_LENGTH: usize = 16;
    pub const INPUT_BUTTON_COUNT: usize = 18;
    pub const INPUT_VALUE_COUNT: usize = 20;
    pub const OUTPUT_BUTTON_COUNT: usize = 22;
    pub const OUTPUT_VALUE_COUNT: usize = 24;
    pub const FEATURE_BUTTON_COUNT: usize = 26;
    pub const FEATURE_VALUE_COUNT: usize = 28;
    pub const INPUT_REPORT_COUNT: usize = 30;
    pub const OUTPUT_REPORT_COUNT: usize = 34;
    pub const FEATURE_REPORT_COUNT: usize = 38;
    /// Displacement of the output section from the end of the header.
    pub const OUTPUT_SECTION_OFFSET: usize = 42;
    /// Displacement of the feature section from the end of the header.
    pub const FEATURE_SECTION_OFFSET: usize = 46;
}

/// Report record field offsets from the start of the record.
pub mod report_record {
    pub const REPORT_ID: usize = 0;
    /// Record byte size including elements: the displacement to the next
    /// record in the section.
    pub const SIZE: usize = 1;
    pub const ELEMENT_COUNT: usize = 5;
}

/// Element record field offsets from the start of the record.
pub mod element_record {
    pub const KIND: usize = 0;
    pub const USAGE_PAGE: usize = 1;
    pub const REPORT_ID: usize = 3;
    pub const BIT_FIELD: usize = 4;
    pub const IS_RANGE: usize = 5;
    pub const IS_STRING_RANGE: usize = 6;
    pub const IS_DESIGNATOR_RANGE: usize = 7;
    pub const IS_ABSOLUTE: usize = 8;
    pub const HAS_NULL: usize = 9;
    pub const BIT_SIZE: usize = 10;
    pub const REPORT_COUNT: usize = 12;
    pub const UNIT_EXPONENT: usize = 14;
    pub const UNIT: usize = 18;
    pub const LOGICAL_MIN: usize = 22;
    pub const LOGICAL_MAX: usize = 26;
    pub const PHYSICAL_MIN: usize = 30;
    pub const PHYSICAL_MAX: usize = 34;
    pub const USAGE_MIN: usize = 38;
    pub const USAGE_MAX: usize = 40;
    pub const STRING_MIN: usize = 42;
    pub const STRING_MAX: usize = 44;
    pub const DESIGNATOR_MIN: usize = 46;
    pub const DESIGNATOR_MAX: usize = 48;
    pub const START_BIT: usize = 50;
    pub const BIT_COUNT: usize = 54;
}

/// Total blob size for a compiled layout: one element slot is reserved per
/// usage entry of every field, so constant fields with declared usages
/// leave zero-filled slack after the last record.
pub fn blob_size(compiled: &CompiledLayout) -> usize {
    HEADER_LEN + compiled.element_slots * ELEMENT_LEN + compiled.report_records() * REPORT_LEN
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn put_u8(&mut self, at: usize, value: u8) {
        self.buf[at] = value;
    }

    fn put_bool(&mut self, at: usize, value: bool) {
        self.buf[at] = u8::from(value);
    }

    fn put_u16(&mut self, at: usize, value: u16) {
        self.buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, at: usize, value: u32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_i32(&mut self, at: usize, value: i32) {
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Serialize a compiled layout into a fresh blob.
///
/// `device_usage` and `device_usage_page` come from the root collection's
/// snapshot (its first discrete usage entry and usage page).
pub fn serialize(compiled: &CompiledLayout, device_usage: u16, device_usage_page: u16) -> Vec<u8> {
    let total = blob_size(compiled);
    let mut writer = Writer {
        buf: vec![0u8; total],
    };

    writer.buf[header::MAGIC..header::MAGIC + 4].copy_from_slice(&LAYOUT_MAGIC);
    writer.put_u32(header::TOTAL_SIZE, total as u32);
    writer.put_u16(header::USAGE, device_usage);
    writer.put_u16(header::USAGE_PAGE, device_usage_page);

    writer.put_u16(header::INPUT_BYTE_LENGTH, compiled.input.byte_length);
    writer.put_u16(header::OUTPUT_BYTE_LENGTH, compiled.output.byte_length);
    writer.put_u16(header::FEATURE_BYTE_LENGTH, compiled.feature.byte_length);

    writer.put_u16(header::INPUT_BUTTON_COUNT, compiled.input.button_count);
    writer.put_u16(header::INPUT_VALUE_COUNT, compiled.input.value_count);
    writer.put_u16(header::OUTPUT_BUTTON_COUNT, compiled.output.button_count);
    writer.put_u16(header::OUTPUT_VALUE_COUNT, compiled.output.value_count);
    writer.put_u16(header::FEATURE_BUTTON_COUNT, compiled.feature.button_count);
    writer.put_u16(header::FEATURE_VALUE_COUNT, compiled.feature.value_count);

    writer.put_u32(header::INPUT_REPORT_COUNT, compiled.input.reports.len() as u32);
    writer.put_u32(header::OUTPUT_REPORT_COUNT, compiled.output.reports.len() as u32);
    writer.put_u32(header::FEATURE_REPORT_COUNT, compiled.feature.reports.len() as u32);

    let mut cursor = HEADER_LEN;
    for direction in [Direction::Input, Direction::Output, Direction::Feature] {
        let layout = compiled.direction(direction);
        if !layout.reports.is_empty() {
            let section_offset = (cursor - HEADER_LEN) as u32;
            match direction {
                Direction::Input => {}
                Direction::Output => writer.put_u32(header::OUTPUT_SECTION_OFFSET, section_offset),
                Direction::Feature => {
                    writer.put_u32(header::FEATURE_SECTION_OFFSET, section_offset);
                }
            }
        }
        for report in &layout.reports {
            cursor = write_report(&mut writer, cursor, report);
        }
    }

    writer.buf
}

fn write_report(writer: &mut Writer, at: usize, report: &Report) -> usize {
    let record_size = REPORT_LEN + report.elements.len() * ELEMENT_LEN;
    writer.put_u8(at + report_record::REPORT_ID, report.report_id);
    writer.put_u32(at + report_record::SIZE, record_size as u32);
    writer.put_u32(at + report_record::ELEMENT_COUNT, report.elements.len() as u32);

    let mut cursor = at + REPORT_LEN;
    for element in &report.elements {
        write_element(writer, cursor, element);
        cursor += ELEMENT_LEN;
    }
    cursor
}

fn write_element(writer: &mut Writer, at: usize, element: &Element) {
    use element_record as rec;

    let selector = element.selector();
    writer.put_bool(at + rec::IS_RANGE, selector.is_range);
    writer.put_bool(at + rec::IS_STRING_RANGE, selector.is_string_range);
    writer.put_bool(at + rec::IS_DESIGNATOR_RANGE, selector.is_designator_range);
    writer.put_u16(at + rec::USAGE_MIN, selector.usage_min);
    writer.put_u16(at + rec::USAGE_MAX, selector.usage_max);
    writer.put_u16(at + rec::STRING_MIN, selector.string_min);
    writer.put_u16(at + rec::STRING_MAX, selector.string_max);
    writer.put_u16(at + rec::DESIGNATOR_MIN, selector.designator_min);
    writer.put_u16(at + rec::DESIGNATOR_MAX, selector.designator_max);
    writer.put_u32(at + rec::START_BIT, element.start_bit);
    writer.put_u32(at + rec::BIT_COUNT, element.bit_count);

    match &element.caps {
        ElementCaps::Button(button) => {
            writer.put_u8(at + rec::KIND, ELEMENT_KIND_BUTTON);
            writer.put_u16(at + rec::USAGE_PAGE, button.usage_page);
            writer.put_u8(at + rec::REPORT_ID, button.report_id);
            writer.put_bool(at + rec::BIT_FIELD, button.bit_field);
            writer.put_bool(at + rec::IS_ABSOLUTE, button.is_absolute);
        }
        ElementCaps::Value(value) => {
            writer.put_u8(at + rec::KIND, ELEMENT_KIND_VALUE);
            writer.put_u16(at + rec::USAGE_PAGE, value.usage_page);
            writer.put_u8(at + rec::REPORT_ID, value.report_id);
            writer.put_bool(at + rec::BIT_FIELD, value.bit_field);
            writer.put_bool(at + rec::IS_ABSOLUTE, value.is_absolute);
            writer.put_bool(at + rec::HAS_NULL, value.has_null);
            writer.put_u16(at + rec::BIT_SIZE, value.bit_size);
            writer.put_u16(at + rec::REPORT_COUNT, value.report_count);
            writer.put_i32(at + rec::UNIT_EXPONENT, value.unit_exponent);
            writer.put_i32(at + rec::UNIT, value.unit);
            writer.put_i32(at + rec::LOGICAL_MIN, value.logical_min);
            writer.put_i32(at + rec::LOGICAL_MAX, value.logical_max);
            writer.put_i32(at + rec::PHYSICAL_MIN, value.physical_min);
            writer.put_i32(at + rec::PHYSICAL_MAX, value.physical_max);
        }
    }
}
