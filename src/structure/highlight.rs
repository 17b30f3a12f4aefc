// Thu Oct 15 2026 - Alex

use crate::memory::{Address, MemoryAccessor, POINTER_SIZE};
use crate::structure::{ClassDescriptor, FieldDescriptor, FieldKind};
use serde::Serialize;

const MAX_NESTING: u32 = 16;

/// Colour of one byte in the hex view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum HexColor {
    #[default]
    Default,
    Integer,
    Float,
    Text,
    Null,
    Pointer,
    /// Points at an object of a known class.
    ObjectPointer,
    CodePointer,
    BadPointer,
}

/// Colours object snapshots by their class layout.
pub struct Highlighter<'a> {
    memory: &'a dyn MemoryAccessor,
    is_known_object: &'a dyn Fn(Address) -> bool,
}

impl<'a> Highlighter<'a> {
    /// `is_known_object` decides whether a readable pointer target holds an object of a known class.
    pub fn new(memory: &'a dyn MemoryAccessor, is_known_object: &'a dyn Fn(Address) -> bool) -> Self {
        Self {
            memory,
            is_known_object,
        }
    }

    /// One colour per byte of `bytes`, the snapshot of an object of `class`.
    pub fn highlight(&self, class: &ClassDescriptor, bytes: &[u8]) -> Vec<HexColor> {
        let mut colors = vec![HexColor::Default; bytes.len()];
        self.color_class(class, 0, bytes, &mut colors, 0);

        let word = POINTER_SIZE as usize;
        for start in (0..bytes.len()).step_by(word) {
            let end = start + word;
            if end > bytes.len() || colors[start..end].iter().any(|c| *c != HexColor::Default) {
                continue;
            }
            let color = self.pointer_color(read_word(&bytes[start..end]), HexColor::Default);
            colors[start..end].fill(color);
        }
        colors
    }

    fn color_class(&self, class: &ClassDescriptor, base: usize, bytes: &[u8], colors: &mut [HexColor], depth: u32) {
        if depth > MAX_NESTING {
            return;
        }
        for field in &class.fields {
            let start = base + field.offset as usize;
            let end = (start + field.size as usize).min(bytes.len());
            if start >= end {
                continue;
            }
            self.color_field(field, start, end, bytes, colors, depth);
        }
    }

    fn color_field(
        &self,
        field: &FieldDescriptor,
        start: usize,
        end: usize,
        bytes: &[u8],
        colors: &mut [HexColor],
        depth: u32,
    ) {
        match field.kind {
            kind if kind.is_integer() || kind == FieldKind::Boolean => colors[start..end].fill(HexColor::Integer),
            kind if kind.is_float() => colors[start..end].fill(HexColor::Float),
            FieldKind::ByteString => {
                for (color, byte) in colors[start..end].iter_mut().zip(&bytes[start..end]) {
                    *color = if *byte == 0 { HexColor::Null } else { HexColor::Text };
                }
            }
            FieldKind::Char | FieldKind::CharString => {
                for unit in (start..end).step_by(2) {
                    let unit_end = (unit + 2).min(end);
                    let color = if bytes[unit..unit_end].iter().all(|b| *b == 0) {
                        HexColor::Null
                    } else {
                        HexColor::Text
                    };
                    colors[unit..unit_end].fill(color);
                }
            }
            kind if kind.is_pointer() => {
                let word_end = start + POINTER_SIZE as usize;
                if word_end <= bytes.len() {
                    let color = self.pointer_color(read_word(&bytes[start..word_end]), HexColor::BadPointer);
                    colors[start..word_end].fill(color);
                }
            }
            FieldKind::Object | FieldKind::ObjectArray => {
                let Some(element) = &field.element_class else {
                    return;
                };
                let stride = element.estimated_size as usize;
                if stride == 0 {
                    return;
                }
                let mut offset = start;
                while offset + stride <= end {
                    self.color_class(element, offset, bytes, colors, depth + 1);
                    offset += stride;
                }
            }
            _ => {}
        }
    }

    fn pointer_color(&self, target: Address, unreadable: HexColor) -> HexColor {
        if target.is_null() {
            HexColor::Null
        } else if self.memory.can_execute(target) {
            HexColor::CodePointer
        } else if !self.memory.can_read(target) {
            unreadable
        } else if (self.is_known_object)(target) {
            HexColor::ObjectPointer
        } else {
            HexColor::Pointer
        }
    }
}

fn read_word(bytes: &[u8]) -> Address {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    Address::new(u64::from_le_bytes(word))
}
