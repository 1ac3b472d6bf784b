//! Capability state accumulated while walking descriptor items.
//!
//! One [`Caps`] value is the mutable "current capability" record: every
//! Global and Local item seen so far, captured by value into each report
//! field and collection as they are created. Global Push/Pop items save and
//! restore whole snapshots through an explicit stack owned by the parser.

/// Upper bound on discrete usages per field.
///
/// A deliberate, documented limitation: downstream layout math assumes
/// bounded fan-out per field, so the discrete usage list is a fixed array
/// with an explicit count rather than a growable collection. Usages past the
/// cap are reported and dropped.
pub const MAX_USAGES: usize = 10;

/// Snapshot of all Global and Local item state.
///
/// Plain `Copy` value type; snapshots taken for fields, collections and the
/// save stack never alias each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caps {
    pub usage_page: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub unit_exponent: i32,
    pub unit: i32,
    pub bit_size: u16,
    pub report_id: u8,
    pub report_count: u16,

    /// Usage selector: either `usages[..usage_count]` (discrete) or
    /// `usage_min..=usage_max` (range), discriminated by `is_range`.
    pub is_range: bool,
    pub usage_count: usize,
    pub usages: [u16; MAX_USAGES],
    pub usage_min: u16,
    pub usage_max: u16,

    /// String-index selector, same discrete/range duality.
    pub is_string_range: bool,
    pub string_index: u16,
    pub string_min: u16,
    pub string_max: u16,

    /// Designator-index selector, same discrete/range duality.
    pub is_designator_range: bool,
    pub designator_index: u16,
    pub designator_min: u16,
    pub designator_max: u16,

    pub delimiter: u32,
}

impl Caps {
    /// Reset Local-item selector state after a Main item is finalized.
    ///
    /// Clears the usage count and the three range discriminants only; the
    /// numeric slots persist until overwritten, so string/designator indices
    /// carry over to the next field unless the descriptor restates them.
    pub fn reset_selectors(&mut self) {
        self.is_range = false;
        self.is_string_range = false;
        self.is_designator_range = false;
        self.usage_count = 0;
    }

    /// Append a discrete usage, marking the selector discrete.
    ///
    /// Returns `false` when the list is already at [`MAX_USAGES`]; the value
    /// is dropped and the selector state is left untouched.
    pub fn append_usage(&mut self, usage: u16) -> bool {
        if self.usage_count >= MAX_USAGES {
            return false;
        }
        self.usages[self.usage_count] = usage;
        self.usage_count += 1;
        self.is_range = false;
        true
    }

    /// Set the lower usage bound, switching the selector to range form.
    ///
    /// A ranged selector always reports a usage count of 1 so the layout
    /// compiler emits exactly one element spanning the range.
    pub fn set_usage_min(&mut self, usage: u16) {
        self.usage_count = 1;
        self.usage_min = usage;
        self.is_range = true;
    }

    /// Set the upper usage bound, switching the selector to range form.
    pub fn set_usage_max(&mut self, usage: u16) {
        self.usage_count = 1;
        self.usage_max = usage;
        self.is_range = true;
    }

    pub fn set_string_index(&mut self, index: u16) {
        self.string_index = index;
        self.is_string_range = false;
    }

    pub fn set_string_min(&mut self, index: u16) {
        self.string_min = index;
        self.is_string_range = true;
    }

    pub fn set_string_max(&mut self, index: u16) {
        self.string_max = index;
        self.is_string_range = true;
    }

    pub fn set_designator_index(&mut self, index: u16) {
        self.designator_index = index;
        self.is_designator_range = false;
    }

    pub fn set_designator_min(&mut self, index: u16) {
        self.designator_min = index;
        self.is_designator_range = true;
    }

    pub fn set_designator_max(&mut self, index: u16) {
        self.designator_max = index;
        self.is_designator_range = true;
    }
}
