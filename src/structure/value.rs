// Thu Oct 15 2026 - Alex

use crate::memory::{Address, MemoryAccessor, MemoryError};
use crate::structure::{ClassDescriptor, FieldDescriptor, FieldKind, StructureError};
use std::fmt;
use std::sync::Arc;

/// Longest C string followed through a `CStringPointer` field.
const MAX_CSTRING: usize = 0x400;

/// An object of a known class at a known address, read lazily.
#[derive(Debug, Clone)]
pub struct ObjectView {
    pub class: Arc<ClassDescriptor>,
    pub address: Address,
}

impl PartialEq for ObjectView {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && Arc::ptr_eq(&self.class, &other.class)
    }
}

/// A typed value read out of process memory.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    UIntPtr(u64),
    IntPtr(i64),
    Char(char),
    Half(f32),
    Single(f32),
    Double(f64),
    Pointer(Address),
    Text(String),
    /// `None` for a null pointer.
    CString(Option<String>),
    Object(ObjectView),
    Array(Vec<ObjectView>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt64(v) | Self::UIntPtr(v) => write!(f, "{}", v),
            Self::Int64(v) | Self::IntPtr(v) => write!(f, "{}", v),
            Self::Char(v) => write!(f, "{:?}", v),
            Self::Half(v) | Self::Single(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Pointer(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
            Self::CString(Some(v)) => write!(f, "{:?}", v),
            Self::CString(None) => write!(f, "null"),
            Self::Object(view) => write!(f, "{} @ {}", view.class.name, view.address),
            Self::Array(views) => write!(f, "[{} elements]", views.len()),
        }
    }
}

/// IEEE 754 binary16 to f32.
pub fn half_to_f32(bits: u16) -> f32 {
    let sign = ((bits >> 15) as u32) << 31;
    let exponent = ((bits >> 10) & 0x1f) as u32;
    let mantissa = (bits & 0x3ff) as u32;

    let value = match (exponent, mantissa) {
        (0, 0) => sign,
        (0, _) => {
            // subnormal: renormalise into f32 range
            let shift = mantissa.leading_zeros() - 21;
            let mantissa = (mantissa << shift) & 0x3ff;
            sign | ((127 - 15 + 1 - shift) << 23) | (mantissa << 13)
        }
        (0x1f, 0) => sign | 0x7f80_0000,
        (0x1f, _) => sign | 0x7fc0_0000 | (mantissa << 13),
        _ => sign | ((exponent + 127 - 15) << 23) | (mantissa << 13),
    };
    f32::from_bits(value)
}

fn read_array<const N: usize>(memory: &dyn MemoryAccessor, addr: Address) -> Result<[u8; N], MemoryError> {
    let mut buf = [0u8; N];
    memory.read_into(addr, &mut buf)?;
    Ok(buf)
}

/// Reads a NUL-terminated string, page by page, stopping at unreadable memory.
fn read_cstring(memory: &dyn MemoryAccessor, addr: Address) -> String {
    let mut bytes = Vec::new();
    let mut current = addr;
    while bytes.len() < MAX_CSTRING {
        let chunk = (memory.rest_of_page(current) as usize).min(MAX_CSTRING - bytes.len());
        let Ok(data) = memory.read_bytes(current, chunk) else {
            break;
        };
        match data.iter().position(|&b| b == 0) {
            Some(end) => {
                bytes.extend_from_slice(&data[..end]);
                break;
            }
            None => bytes.extend_from_slice(&data),
        }
        current = current + chunk as u64;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads the value of `field` inside the object at `base`, without bounds checks.
pub fn read_value(memory: &dyn MemoryAccessor, base: Address, field: &FieldDescriptor) -> Result<FieldValue, MemoryError> {
    let addr = base + field.offset as u64;
    let value = match field.kind {
        FieldKind::Boolean => FieldValue::Boolean(memory.read_u8(addr)? != 0),
        FieldKind::Byte => FieldValue::Byte(memory.read_u8(addr)?),
        FieldKind::SByte => FieldValue::SByte(memory.read_u8(addr)? as i8),
        FieldKind::UInt16 => FieldValue::UInt16(memory.read_u16(addr)?),
        FieldKind::Int16 => FieldValue::Int16(memory.read_u16(addr)? as i16),
        FieldKind::UInt32 => FieldValue::UInt32(memory.read_u32(addr)?),
        FieldKind::Int32 => FieldValue::Int32(memory.read_u32(addr)? as i32),
        FieldKind::UInt64 => FieldValue::UInt64(memory.read_u64(addr)?),
        FieldKind::Int64 => FieldValue::Int64(memory.read_u64(addr)? as i64),
        FieldKind::UIntPtr => FieldValue::UIntPtr(memory.read_u64(addr)?),
        FieldKind::IntPtr => FieldValue::IntPtr(memory.read_u64(addr)? as i64),
        FieldKind::Char => {
            let unit = memory.read_u16(addr)?;
            FieldValue::Char(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        FieldKind::Half => FieldValue::Half(half_to_f32(memory.read_u16(addr)?)),
        FieldKind::Single => FieldValue::Single(f32::from_le_bytes(read_array::<4>(memory, addr)?)),
        FieldKind::Double => FieldValue::Double(f64::from_le_bytes(read_array::<8>(memory, addr)?)),
        FieldKind::Pointer => FieldValue::Pointer(memory.read_ptr(addr)?),
        FieldKind::ByteString => {
            let bytes = memory.read_bytes(addr, field.size as usize)?;
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            FieldValue::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        FieldKind::CharString => {
            let bytes = memory.read_bytes(addr, field.size as usize & !1)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&u| u != 0)
                .collect();
            FieldValue::Text(String::from_utf16_lossy(&units))
        }
        FieldKind::CStringPointer => {
            let target = memory.read_ptr(addr)?;
            if target.is_null() {
                FieldValue::CString(None)
            } else {
                FieldValue::CString(Some(read_cstring(memory, target)))
            }
        }
        FieldKind::Object => FieldValue::Object(ObjectView {
            class: field.element_class.clone().unwrap_or_else(ClassDescriptor::empty),
            address: addr,
        }),
        FieldKind::ObjectArray => {
            let class = field.element_class.clone().unwrap_or_else(ClassDescriptor::empty);
            let stride = class.estimated_size as u64;
            let views = (0..field.element_count() as u64)
                .map(|i| ObjectView {
                    class: class.clone(),
                    address: addr + i * stride,
                })
                .collect();
            FieldValue::Array(views)
        }
    };
    Ok(value)
}

/// Reads the field named `name` of the `class` object at `base`.
///
/// A field that does not fit inside the class's estimated size is a caller bug and is reported
/// as [`StructureError::FieldOutOfRange`] before any memory is touched.
pub fn read_field(
    memory: &dyn MemoryAccessor,
    class: &ClassDescriptor,
    base: Address,
    name: &str,
) -> Result<FieldValue, StructureError> {
    let field = class.field(name).ok_or_else(|| StructureError::UnknownField {
        class: class.name.clone(),
        field: name.to_string(),
    })?;
    if field.end() > class.estimated_size as u64 {
        return Err(StructureError::FieldOutOfRange {
            class: class.name.clone(),
            field: field.name.clone(),
            offset: field.offset,
            size: field.size,
            class_size: class.estimated_size,
        });
    }
    Ok(read_value(memory, base, field)?)
}
