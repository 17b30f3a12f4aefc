// Wed Oct 14 2026 - Alex

use crate::memory::POINTER_SIZE;
use crate::structure::ClassDescriptor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Boolean,
    Byte,
    SByte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    UIntPtr,
    IntPtr,
    /// UTF-16 code unit.
    Char,
    Half,
    Single,
    Double,
    Pointer,
    /// Fixed-size inline byte string.
    ByteString,
    /// Fixed-size inline UTF-16 string.
    CharString,
    Object,
    ObjectArray,
    CStringPointer,
}

impl FieldKind {
    /// Size of one value, `None` for kinds whose size comes from the field.
    pub fn scalar_size(self) -> Option<u32> {
        match self {
            Self::Boolean | Self::Byte | Self::SByte => Some(1),
            Self::UInt16 | Self::Int16 | Self::Char | Self::Half => Some(2),
            Self::UInt32 | Self::Int32 | Self::Single => Some(4),
            Self::UInt64 | Self::Int64 | Self::Double => Some(8),
            Self::UIntPtr | Self::IntPtr | Self::Pointer | Self::CStringPointer => Some(POINTER_SIZE as u32),
            Self::ByteString | Self::CharString | Self::Object | Self::ObjectArray => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::SByte
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
                | Self::UIntPtr
                | Self::IntPtr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Half | Self::Single | Self::Double)
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::Char | Self::ByteString | Self::CharString)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, Self::Pointer | Self::CStringPointer)
    }

    /// The inline string kind a fixed array of `self` becomes when flagged as a string.
    pub fn as_string(self) -> Self {
        match self {
            Self::Byte | Self::SByte => Self::ByteString,
            Self::Char | Self::UInt16 => Self::CharString,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub kind: FieldKind,
    /// Class of the nested object, or of each element for object arrays.
    pub element_class: Option<Arc<ClassDescriptor>>,
}

impl FieldDescriptor {
    pub fn new(name: &str, offset: u32, size: u32, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            offset,
            size,
            kind,
            element_class: None,
        }
    }

    pub fn scalar(name: &str, offset: u32, kind: FieldKind) -> Self {
        Self::new(name, offset, kind.scalar_size().unwrap_or_default(), kind)
    }

    pub fn with_element_class(mut self, class: Arc<ClassDescriptor>) -> Self {
        self.element_class = Some(class);
        self
    }

    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    /// Number of elements for arrays and inline strings, 1 otherwise.
    pub fn element_count(&self) -> u32 {
        let element_size = match (self.kind, &self.element_class) {
            (FieldKind::ObjectArray, Some(class)) => class.estimated_size,
            (FieldKind::ByteString, _) => 1,
            (FieldKind::CharString, _) => 2,
            (kind, _) => kind.scalar_size().unwrap_or(self.size),
        };
        if element_size == 0 {
            1
        } else {
            (self.size / element_size).max(1)
        }
    }

    /// Names starting with `<` or containing `::` are generated, not declared.
    pub fn is_synthetic(&self) -> bool {
        self.name.starts_with('<') || self.name.contains("::")
    }

    /// Ordering of a class's field list: offset ascending, size descending, then name.
    pub fn layout_order(&self, other: &Self) -> Ordering {
        self.offset
            .cmp(&other.offset)
            .then_with(|| other.size.cmp(&self.size))
            .then_with(|| self.name.to_lowercase().cmp(&other.name.to_lowercase()))
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+0x{:x} {} ({:?}, {} bytes)", self.offset, self.name, self.kind, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_order() {
        let mut fields = vec![
            FieldDescriptor::scalar("b", 8, FieldKind::UInt32),
            FieldDescriptor::new("Inner", 8, 16, FieldKind::Object),
            FieldDescriptor::scalar("A", 8, FieldKind::Int32),
            FieldDescriptor::scalar("vtbl", 0, FieldKind::Pointer),
        ];
        fields.sort_by(FieldDescriptor::layout_order);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["vtbl", "Inner", "A", "b"]);
    }

    #[test]
    fn test_element_count() {
        assert_eq!(FieldDescriptor::new("Name", 0, 32, FieldKind::CharString).element_count(), 16);
        assert_eq!(FieldDescriptor::new("Values", 0, 16, FieldKind::Single).element_count(), 4);
        assert_eq!(FieldDescriptor::scalar("Flag", 0, FieldKind::Boolean).element_count(), 1);
    }

    #[test]
    fn test_string_kinds() {
        assert_eq!(FieldKind::Byte.as_string(), FieldKind::ByteString);
        assert_eq!(FieldKind::Char.as_string(), FieldKind::CharString);
        assert_eq!(FieldKind::Single.as_string(), FieldKind::Single);
        assert_eq!(FieldKind::Pointer.scalar_size(), Some(8));
        assert_eq!(FieldKind::Object.scalar_size(), None);
    }

    #[test]
    fn test_synthetic_names() {
        assert!(FieldDescriptor::scalar("<vf0>", 0, FieldKind::Pointer).is_synthetic());
        assert!(FieldDescriptor::scalar("Base::Dtor", 0, FieldKind::Pointer).is_synthetic());
        assert!(!FieldDescriptor::scalar("Count", 0, FieldKind::Int32).is_synthetic());
    }
}
