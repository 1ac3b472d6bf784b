//! Layout compilation: ordering, report grouping, bit-offset assignment.
//!
//! Consumes the flat, encounter-ordered field list and produces per-direction
//! report groups with every addressable element's start bit and width fixed.
//! Classification into button or value elements happens exactly once here,
//! by usage-page comparison; the serializer and view only carry the verdict.

use std::mem;

use crate::caps::Caps;
use crate::tree::{Direction, Field};

/// Usage page housing single-bit button controls.
pub const BUTTON_USAGE_PAGE: u16 = 0x09;

/// Leading bits of every physical report, reserved for the report id byte.
const REPORT_ID_BITS: u32 = 8;

/// Selector slots shared by both element kinds.
///
/// For the not-range form the min slot holds the scalar (discrete usage,
/// string index, designator index) and the max slot stays zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selector {
    pub is_range: bool,
    pub is_string_range: bool,
    pub is_designator_range: bool,
    pub usage_min: u16,
    pub usage_max: u16,
    pub string_min: u16,
    pub string_max: u16,
    pub designator_min: u16,
    pub designator_max: u16,
}

/// Button element capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCaps {
    pub usage_page: u16,
    pub report_id: u8,
    pub bit_field: bool,
    pub is_absolute: bool,
    pub selector: Selector,
}

/// Value element capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCaps {
    pub usage_page: u16,
    pub report_id: u8,
    pub bit_field: bool,
    pub is_absolute: bool,
    pub has_null: bool,
    pub bit_size: u16,
    pub report_count: u16,
    pub unit_exponent: i32,
    pub unit: i32,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub selector: Selector,
}

/// The tagged element variant; the discriminant is fixed at compile time and
/// never re-derived downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCaps {
    Button(ButtonCaps),
    Value(ValueCaps),
}

/// One addressable field within a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// First bit of this element within the physical report, counting the
    /// 8-bit report-id reservation.
    pub start_bit: u32,
    pub bit_count: u32,
    pub caps: ElementCaps,
}

impl Element {
    pub fn selector(&self) -> &Selector {
        match &self.caps {
            ElementCaps::Button(button) => &button.selector,
            ElementCaps::Value(value) => &value.selector,
        }
    }
}

/// One report group: all elements sharing a (direction, report id) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub report_id: u8,
    pub elements: Vec<Element>,
}

/// Compiled reports of one direction plus its aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionLayout {
    pub reports: Vec<Report>,
    /// Longest report of this direction in whole bytes, id byte included.
    pub byte_length: u16,
    pub button_count: u16,
    pub value_count: u16,
}

/// Full compilation result across all three directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledLayout {
    pub input: DirectionLayout,
    pub output: DirectionLayout,
    pub feature: DirectionLayout,
    /// Sum of usage-entry counts over every field, data or constant; sizes
    /// the serialized element pool.
    pub element_slots: usize,
}

impl CompiledLayout {
    pub fn direction(&self, direction: Direction) -> &DirectionLayout {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
            Direction::Feature => &self.feature,
        }
    }

    pub fn report_records(&self) -> usize {
        self.input.reports.len() + self.output.reports.len() + self.feature.reports.len()
    }
}

/// Compile the flat field list into per-direction report layouts.
pub fn compile(fields: &[Field]) -> CompiledLayout {
    let mut ordered: Vec<&Field> = fields.iter().collect();
    // Report ids partition the byte stream into separate physical reports;
    // with only the implicit id 0 the encounter order already groups them.
    if ordered.iter().any(|field| field.caps.report_id != 0) {
        ordered.sort_by_key(|field| (field.caps.report_id, field.index));
    }

    CompiledLayout {
        input: compile_direction(&ordered, Direction::Input),
        output: compile_direction(&ordered, Direction::Output),
        feature: compile_direction(&ordered, Direction::Feature),
        element_slots: fields.iter().map(|field| field.caps.usage_count).sum(),
    }
}

fn compile_direction(ordered: &[&Field], direction: Direction) -> DirectionLayout {
    let mut layout = DirectionLayout::default();
    let mut fields = ordered.iter().filter(|field| field.direction == direction);

    let Some(first) = fields.next() else {
        return layout;
    };

    let mut report = Report {
        report_id: first.caps.report_id,
        elements: Vec::new(),
    };
    let mut cursor = REPORT_ID_BITS;
    let mut max_bits = 0u32;

    for field in std::iter::once(first).chain(fields) {
        if field.caps.report_id != report.report_id {
            max_bits = max_bits.max(cursor);
            let next = Report {
                report_id: field.caps.report_id,
                elements: Vec::new(),
            };
            layout.reports.push(mem::replace(&mut report, next));
            cursor = REPORT_ID_BITS;
        }
        expand_field(field, &mut report, &mut cursor);
        tally_field(field, &mut layout);
    }
    max_bits = max_bits.max(cursor);
    layout.reports.push(report);
    layout.byte_length = max_bits.div_ceil(8) as u16;
    layout
}

/// Emit the elements of one field, advancing the bit cursor.
///
/// Constant fields occupy report space without contributing an addressable
/// element. Data fields emit one element per usage entry: a ranged selector
/// spans the whole range in a single element.
fn expand_field(field: &Field, report: &mut Report, cursor: &mut u32) {
    let caps = &field.caps;

    if !field.flags.is_data {
        // Pathological declared sizes saturate the cursor instead of wrapping.
        *cursor = cursor.saturating_add(u32::from(caps.bit_size) * u32::from(caps.report_count));
        return;
    }

    for slot in 0..caps.usage_count {
        let element = if caps.usage_page == BUTTON_USAGE_PAGE {
            button_element(field, slot, *cursor)
        } else {
            value_element(field, slot, *cursor)
        };
        *cursor = cursor.saturating_add(element.bit_count);
        report.elements.push(element);
    }
}

fn button_element(field: &Field, slot: usize, start_bit: u32) -> Element {
    let caps = &field.caps;
    let bit_count = if caps.is_range {
        u32::from(caps.usage_max).saturating_sub(u32::from(caps.usage_min)) + 1
    } else {
        1
    };
    Element {
        start_bit,
        bit_count,
        caps: ElementCaps::Button(ButtonCaps {
            usage_page: caps.usage_page,
            report_id: caps.report_id,
            bit_field: field.flags.bit_field,
            is_absolute: field.flags.is_absolute,
            selector: element_selector(caps, slot),
        }),
    }
}

fn value_element(field: &Field, slot: usize, start_bit: u32) -> Element {
    let caps = &field.caps;
    // Discrete multi-usage values split the declared report count across the
    // usages only when it exceeds them; otherwise each usage gets one unit.
    let report_count = if caps.usage_count > 1 {
        if usize::from(caps.report_count) > caps.usage_count {
            caps.report_count / caps.usage_count as u16
        } else {
            1
        }
    } else {
        caps.report_count
    };
    Element {
        start_bit,
        bit_count: u32::from(caps.bit_size) * u32::from(report_count),
        caps: ElementCaps::Value(ValueCaps {
            usage_page: caps.usage_page,
            report_id: caps.report_id,
            bit_field: field.flags.bit_field,
            is_absolute: field.flags.is_absolute,
            has_null: field.flags.has_null,
            bit_size: caps.bit_size,
            report_count,
            unit_exponent: caps.unit_exponent,
            unit: caps.unit,
            logical_min: caps.logical_min,
            logical_max: caps.logical_max,
            physical_min: caps.physical_min,
            physical_max: caps.physical_max,
            selector: element_selector(caps, slot),
        }),
    }
}

fn element_selector(caps: &Caps, slot: usize) -> Selector {
    if caps.is_range {
        Selector {
            is_range: true,
            is_string_range: caps.is_string_range,
            is_designator_range: caps.is_designator_range,
            usage_min: caps.usage_min,
            usage_max: caps.usage_max,
            string_min: caps.string_min,
            string_max: caps.string_max,
            designator_min: caps.designator_min,
            designator_max: caps.designator_max,
        }
    } else {
        Selector {
            is_range: false,
            is_string_range: caps.is_string_range,
            is_designator_range: caps.is_designator_range,
            usage_min: caps.usages.get(slot).copied().unwrap_or(0),
            usage_max: 0,
            string_min: caps.string_index,
            string_max: 0,
            designator_min: caps.designator_index,
            designator_max: 0,
        }
    }
}

/// Aggregate button/value totals: a ranged selector counts once, a discrete
/// list counts per usage. Constant fields participate like data fields.
fn tally_field(field: &Field, layout: &mut DirectionLayout) {
    let count = if field.caps.is_range {
        1
    } else {
        field.caps.usage_count as u16
    };
    if field.caps.usage_page == BUTTON_USAGE_PAGE {
        layout.button_count = layout.button_count.saturating_add(count);
    } else {
        layout.value_count = layout.value_count.saturating_add(count);
    }
}
