// Thu Oct 15 2026 - Alex

use crate::analysis::MemoryHeuristics;
use crate::memory::{page, Address, MemoryAccessor, POINTER_SIZE};
use crate::structure::{FieldDescriptor, FieldKind};
use std::collections::BTreeMap;

/// Measures virtual tables by walking their slots.
pub struct VirtualTableWalker<'a> {
    memory: &'a dyn MemoryAccessor,
    heuristics: &'a MemoryHeuristics,
    max_pages: u32,
}

impl<'a> VirtualTableWalker<'a> {
    pub fn new(memory: &'a dyn MemoryAccessor, heuristics: &'a MemoryHeuristics, max_pages: u32) -> Self {
        Self {
            memory,
            heuristics,
            max_pages,
        }
    }

    /// Bytes of function-pointer slots from `start` onwards.
    ///
    /// Null slots are skipped. The walk ends at a slot pointing outside executable memory,
    /// at a slot that looks like a sized destructor (the next table starts there), or
    /// where the memory stops being readable.
    pub fn rest_size(&self, start: Address) -> u64 {
        let page_size = self.memory.page_size();
        let mut size = 0u64;
        let mut current = start;

        for _ in 0..self.max_pages {
            if !self.memory.can_read(current) {
                break;
            }
            let chunk = page::rest_of_page(current, page_size);
            let Ok(bytes) = self.memory.read_bytes(current, chunk as usize) else {
                break;
            };

            for (i, slot) in bytes.chunks_exact(POINTER_SIZE as usize).enumerate() {
                let mut word = [0u8; 8];
                word.copy_from_slice(slot);
                let func = Address::new(u64::from_le_bytes(word));
                if func.is_null() {
                    continue;
                }
                let offset = (i as u64) * POINTER_SIZE;
                if !self.memory.can_execute(func) || self.heuristics.estimate_size_and_displacement(func).is_some() {
                    return size + offset;
                }
            }

            size += chunk;
            current = current + chunk;
        }
        size
    }
}

/// Pointer fields for the first `slots` entries of a table. Entries named in `names`
/// (by slot index) keep their name, the rest are called `<vfN>`.
pub fn slot_fields(slots: u32, names: &BTreeMap<u32, String>) -> Vec<FieldDescriptor> {
    let size = POINTER_SIZE as u32;
    let mut fields: Vec<FieldDescriptor> = names
        .iter()
        .map(|(&index, name)| FieldDescriptor::new(name, index * size, size, FieldKind::Pointer))
        .collect();
    fields.extend(
        (0..slots)
            .filter(|index| !names.contains_key(index))
            .map(|index| FieldDescriptor::new(&format!("<vf{}>", index), index * size, size, FieldKind::Pointer)),
    );
    fields
}
