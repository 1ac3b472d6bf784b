//! HID report descriptor compilation into preparsed report layouts.
//!
//! This crate is intentionally I/O-free: it consumes the raw report
//! descriptor bytes a device enumeration layer obtained elsewhere and
//! compiles them into one contiguous, position-independent blob describing
//! every report the device exchanges — the bit position and semantics of
//! each button or value element plus the aggregate counts a report decoder
//! needs. Descriptor bytes are untrusted; malformed input degrades to the
//! most usable layout the bytes still support instead of failing the device.
//!
//! The pipeline runs synchronously as a pure function of the input bytes:
//! item decoding (the `hid-items` crate), capability accumulation
//! ([`caps`]), structure building ([`parser`]), layout compilation
//! ([`compile`]) and serialization ([`blob`]). [`view`] reads a finished
//! blob back. Concurrent calls share no state.

pub mod blob;
pub mod caps;
pub mod compile;
pub mod parser;
pub mod tree;
pub mod view;

use tracing::debug;

// Flat re-exports so callers can use `hid_preparse::Foo`.
pub use blob::{ELEMENT_LEN, HEADER_LEN, LAYOUT_MAGIC, REPORT_LEN};
pub use caps::{Caps, MAX_USAGES};
pub use compile::{
    BUTTON_USAGE_PAGE, ButtonCaps, CompiledLayout, Element, ElementCaps, Selector, ValueCaps,
};
pub use parser::build_tree;
pub use tree::{Collection, CollectionKind, Direction, Field, FieldFlags, ParseTree};
pub use view::{LayoutError, LayoutView, ReportRecord};

/// Compiled, position-independent layout blob for one device.
///
/// The bytes may be copied or persisted; all internal offsets are relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparsedLayout {
    bytes: Vec<u8>,
}

impl PreparsedLayout {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Structured reader over the blob.
    pub fn view(&self) -> LayoutView<'_> {
        LayoutView::trusted(&self.bytes)
    }
}

/// Compile a report descriptor into a preparsed layout.
///
/// Best-effort: unknown items, usage overflow, save-stack underflow and
/// truncated trailing items are reported via `tracing` and recovered from
/// locally. Returns `None` only when the descriptor declares no
/// Input/Output/Feature item at all, so there is nothing to lay out.
pub fn parse_report_descriptor(descriptor: &[u8]) -> Option<PreparsedLayout> {
    let tree = parser::build_tree(descriptor);
    if tree.fields.is_empty() {
        debug!("descriptor declares no report fields; no layout produced");
        return None;
    }

    let compiled = compile::compile(&tree.fields);
    let root = tree.root();
    let bytes = blob::serialize(&compiled, root.caps.usages[0], root.caps.usage_page);
    Some(PreparsedLayout { bytes })
}
