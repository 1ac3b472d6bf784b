//! Recursive descent over the item stream, building the parse tree.
//!
//! A single mutable [`Parser`] context threads the current capability
//! snapshot, the Push/Pop save stack, and both ordinal counters through the
//! recursion. Selector state resets after every Main item; the save stack is
//! shared across collection nesting levels.
//!
//! Malformed input never aborts the walk: unknown tags, long items, stack
//! underflow and usage-list overflow are reported through `tracing` and
//! skipped, and truncated trailing items read only the bytes present.

use hid_items::{Decoded, Item, ItemType, decode_item, global_tag, local_tag, main_tag};
use hid_items::{signed_value, unsigned_value};
use tracing::{debug, error, trace, warn};

use crate::caps::{Caps, MAX_USAGES};
use crate::tree::{Collection, Direction, Field, FieldFlags, ParseTree};

struct Parser<'a> {
    descriptor: &'a [u8],
    tree: ParseTree,
    caps: Caps,
    stack: Vec<Caps>,
    field_ordinal: u32,
    collection_ordinal: u32,
}

/// Build the collection tree and flat field list for a descriptor.
///
/// Always succeeds; a malformed or empty descriptor yields a tree with
/// fewer (possibly zero) fields.
pub fn build_tree(descriptor: &[u8]) -> ParseTree {
    let mut parser = Parser {
        descriptor,
        tree: ParseTree::new(),
        caps: Caps::default(),
        stack: Vec::new(),
        field_ordinal: 0,
        collection_ordinal: 0,
    };

    parser.parse_items(0, 0);

    if !parser.stack.is_empty() {
        error!(
            "{} unpopped capability snapshots left on the save stack",
            parser.stack.len()
        );
        parser.stack.clear();
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        trace_collection(&parser.tree, 0, 0);
    }

    parser.tree
}

impl Parser<'_> {
    /// Parse items from `start` until the buffer ends or an End Collection
    /// item closes this nesting level. Returns the cursor position just past
    /// the last item consumed.
    fn parse_items(&mut self, start: usize, collection: usize) -> usize {
        let mut pos = start;
        while pos < self.descriptor.len() {
            let item = match decode_item(self.descriptor, pos) {
                Some(Decoded::Item(item)) => item,
                Some(Decoded::LongItem { next }) => {
                    error!("long item at offset {pos}; skipping prefix");
                    pos = next;
                    continue;
                }
                None => break,
            };
            trace!(
                "item at {pos}: {:?} tag {:#03x} size {} value {:#x}",
                item.item_type, item.tag, item.payload_len, item.raw
            );

            match item.item_type {
                ItemType::Main => match item.tag {
                    main_tag::INPUT => self.add_field(Direction::Input, &item, collection),
                    main_tag::OUTPUT => self.add_field(Direction::Output, &item, collection),
                    main_tag::FEATURE => self.add_field(Direction::Feature, &item, collection),
                    main_tag::COLLECTION => {
                        let child = self.open_collection(&item, collection);
                        pos = self.parse_items(item.next, child);
                        continue;
                    }
                    main_tag::END_COLLECTION => return item.next,
                    tag => error!("unknown main item tag {tag:#x}"),
                },
                ItemType::Global => self.apply_global(&item),
                ItemType::Local => self.apply_local(&item),
                ItemType::Reserved => {
                    error!("reserved item type, tag {:#x}", item.tag);
                }
            }

            pos = item.next;
        }
        pos
    }

    fn add_field(&mut self, direction: Direction, item: &Item, collection: usize) {
        let field = Field {
            caps: self.caps,
            direction,
            flags: FieldFlags::from_control_value(direction, item.raw),
            index: self.field_ordinal,
            collection,
        };
        self.field_ordinal += 1;

        let id = self.tree.fields.len();
        self.tree.fields.push(field);
        self.tree.collections[collection].fields.push(id);
        self.caps.reset_selectors();
    }

    fn open_collection(&mut self, item: &Item, parent: usize) -> usize {
        // The first collection opened anywhere copies its snapshot into the
        // parent as well, giving the root the device's top-level usage.
        // Later collections leave their parents untouched, so composite
        // devices keep an under-described root.
        if self.collection_ordinal == 0 {
            self.tree.collections[parent].caps = self.caps;
        }

        let type_value = item.raw;
        match type_value {
            0x07..=0x7F => error!("reserved collection type {type_value:#x}"),
            0x80..=0xFF => error!("vendor-defined collection type {type_value:#x}"),
            _ => {}
        }

        let id = self.tree.collections.len();
        self.tree.collections.push(Collection {
            index: self.collection_ordinal,
            type_value,
            caps: self.caps,
            parent: Some(parent),
            fields: Vec::new(),
            children: Vec::new(),
        });
        self.tree.collections[parent].children.push(id);
        self.collection_ordinal += 1;
        self.caps.reset_selectors();
        id
    }

    fn apply_global(&mut self, item: &Item) {
        let unsigned = unsigned_value(item.payload_len, item.raw);
        let signed = signed_value(item.payload_len, item.raw);
        match item.tag {
            global_tag::USAGE_PAGE => self.caps.usage_page = unsigned as u16,
            global_tag::LOGICAL_MINIMUM => self.caps.logical_min = signed,
            global_tag::LOGICAL_MAXIMUM => self.caps.logical_max = signed,
            global_tag::PHYSICAL_MINIMUM => self.caps.physical_min = signed,
            global_tag::PHYSICAL_MAXIMUM => self.caps.physical_max = signed,
            global_tag::UNIT_EXPONENT => self.caps.unit_exponent = signed,
            global_tag::UNIT => self.caps.unit = signed,
            global_tag::REPORT_SIZE => self.caps.bit_size = unsigned as u16,
            global_tag::REPORT_ID => self.caps.report_id = unsigned as u8,
            global_tag::REPORT_COUNT => self.caps.report_count = unsigned as u16,
            global_tag::PUSH => {
                trace!("push");
                self.stack.push(self.caps);
            }
            global_tag::POP => {
                trace!("pop");
                match self.stack.pop() {
                    Some(saved) => self.caps = saved,
                    None => error!("pop with no saved state"),
                }
            }
            tag => error!("unknown global item tag {tag:#x}"),
        }
    }

    fn apply_local(&mut self, item: &Item) {
        let value = unsigned_value(item.payload_len, item.raw) as u16;
        match item.tag {
            local_tag::USAGE => {
                if !self.caps.append_usage(value) {
                    warn!("more than {MAX_USAGES} usages on one field; dropping {value:#x}");
                }
            }
            local_tag::USAGE_MINIMUM => self.caps.set_usage_min(value),
            local_tag::USAGE_MAXIMUM => self.caps.set_usage_max(value),
            local_tag::DESIGNATOR_INDEX => self.caps.set_designator_index(value),
            local_tag::DESIGNATOR_MINIMUM => self.caps.set_designator_min(value),
            local_tag::DESIGNATOR_MAXIMUM => self.caps.set_designator_max(value),
            local_tag::STRING_INDEX => self.caps.set_string_index(value),
            local_tag::STRING_MINIMUM => self.caps.set_string_min(value),
            local_tag::STRING_MAXIMUM => self.caps.set_string_max(value),
            local_tag::DELIMITER => {
                self.caps.delimiter = unsigned_value(item.payload_len, item.raw);
            }
            tag => error!("unknown local item tag {tag:#x}"),
        }
    }
}

fn trace_collection(tree: &ParseTree, id: usize, depth: usize) {
    let Some(collection) = tree.collections.get(id) else {
        return;
    };
    debug!(
        "{:indent$}collection {} {:?} ({} fields, {} children)",
        "",
        collection.index,
        collection.kind(),
        collection.fields.len(),
        collection.children.len(),
        indent = depth * 2,
    );
    for &field_id in &collection.fields {
        if let Some(field) = tree.fields.get(field_id) {
            debug!(
                "{:indent$}field {} {:?} page {:#x} bits {}x{} id {}",
                "",
                field.index,
                field.direction,
                field.caps.usage_page,
                field.caps.bit_size,
                field.caps.report_count,
                field.caps.report_id,
                indent = depth * 2 + 2,
            );
        }
    }
    for &child in &collection.children {
        trace_collection(tree, child, depth + 1);
    }
}
