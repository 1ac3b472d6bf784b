//! Parse-tree types: report fields and the collection hierarchy.
//!
//! Fields and collections live in index arenas owned by [`ParseTree`];
//! parent and owner back-references are arena indices, never owning links.
//! The field arena doubles as the flat, encounter-ordered field list the
//! layout compiler consumes.

use crate::caps::Caps;

/// Report direction of a main data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Feature,
}

// Main-item control-value bits ("Device Class Definition for Human
// Interface Devices", Input/Output/Feature items).
const DATA_CONST: u32 = 0x01; /* Data (0)             | Constant (1)       */
const ARRAY_VAR: u32 = 0x02; /* Array (0)            | Variable (1)       */
const ABS_REL: u32 = 0x04; /* Absolute (0)         | Relative (1)       */
const WRAP: u32 = 0x08; /* No Wrap (0)          | Wrap (1)           */
const LINEAR: u32 = 0x10; /* Linear (0)           | Non Linear (1)     */
const PREF_STATE: u32 = 0x20; /* Preferred State (0)  | No Preferred (1)   */
const NULL_STATE: u32 = 0x40; /* No Null position (0) | Null state (1)     */
const VOLATILE: u32 = 0x80; /* Non Volatile (0)     | Volatile (1)       */
const BITFIELD: u32 = 0x100; /* Bit Field (0)        | Buffered Bytes (1) */

/// The nine behavior flags of an Input/Output/Feature item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub is_data: bool,
    pub is_array: bool,
    pub is_absolute: bool,
    pub wrap: bool,
    pub linear: bool,
    pub preferred_state: bool,
    pub has_null: bool,
    pub volatile: bool,
    pub bit_field: bool,
}

impl FieldFlags {
    /// Derive the flags from a main item's control value.
    ///
    /// Input items carry no volatile bit; bit 7 stays clear for them.
    pub fn from_control_value(direction: Direction, value: u32) -> Self {
        FieldFlags {
            is_data: value & DATA_CONST == 0,
            is_array: value & ARRAY_VAR == 0,
            is_absolute: value & ABS_REL == 0,
            wrap: value & WRAP != 0,
            linear: value & LINEAR == 0,
            preferred_state: value & PREF_STATE == 0,
            has_null: value & NULL_STATE != 0,
            volatile: direction != Direction::Input && value & VOLATILE != 0,
            bit_field: value & BITFIELD == 0,
        }
    }
}

/// One report field, created per Input/Output/Feature item.
///
/// Read-only once built; dropped with the whole tree.
#[derive(Debug, Clone)]
pub struct Field {
    /// Capability snapshot at creation time.
    pub caps: Caps,
    pub direction: Direction,
    pub flags: FieldFlags,
    /// Encounter-order ordinal across the whole descriptor; sort tie-break.
    pub index: u32,
    /// Owning collection, as an arena index into [`ParseTree::collections`].
    pub collection: usize,
}

/// Named collection types. Values 0x07..=0x7F are reserved, 0x80..=0xFF
/// vendor-defined; both are kept verbatim and reported when opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Physical,
    Application,
    Logical,
    Report,
    NamedArray,
    UsageSwitch,
    UsageModifier,
    Reserved,
    VendorDefined,
}

impl CollectionKind {
    pub fn from_value(value: u32) -> Self {
        match value {
            0x00 => CollectionKind::Physical,
            0x01 => CollectionKind::Application,
            0x02 => CollectionKind::Logical,
            0x03 => CollectionKind::Report,
            0x04 => CollectionKind::NamedArray,
            0x05 => CollectionKind::UsageSwitch,
            0x06 => CollectionKind::UsageModifier,
            0x80..=0xFF => CollectionKind::VendorDefined,
            _ => CollectionKind::Reserved,
        }
    }
}

/// One node of the collection tree.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Ordinal assigned in opening order. The synthesized root carries 1 and
    /// the first explicit collection 0, so the two overlap on a device with
    /// at least two collections; nothing downstream keys on the ordinal.
    pub index: u32,
    /// Raw type value from the Collection item.
    pub type_value: u32,
    /// Snapshot at opening time. Only the root of a device whose first
    /// explicit collection copied upward holds meaningful selector data.
    pub caps: Caps,
    /// Arena index of the parent; `None` for the synthesized root.
    pub parent: Option<usize>,
    /// Owned fields, in encounter order, as indices into the field arena.
    pub fields: Vec<usize>,
    /// Nested collections, in opening order.
    pub children: Vec<usize>,
}

impl Collection {
    pub fn kind(&self) -> CollectionKind {
        CollectionKind::from_value(self.type_value)
    }
}

/// Arena-owned parse result: the collection tree plus the flat,
/// encounter-ordered field list.
#[derive(Debug, Clone)]
pub struct ParseTree {
    pub collections: Vec<Collection>,
    pub fields: Vec<Field>,
}

impl ParseTree {
    /// Tree holding only the synthesized root collection.
    pub fn new() -> Self {
        ParseTree {
            collections: vec![Collection {
                index: 1,
                type_value: 0,
                caps: Caps::default(),
                parent: None,
                fields: Vec::new(),
                children: Vec::new(),
            }],
            fields: Vec::new(),
        }
    }

    pub fn root(&self) -> &Collection {
        &self.collections[0]
    }
}

impl Default for ParseTree {
    fn default() -> Self {
        Self::new()
    }
}
