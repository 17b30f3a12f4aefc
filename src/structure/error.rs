// Thu Oct 15 2026 - Alex

use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Field {field} (+0x{offset:x}, {size} bytes) lies outside {class} ({class_size} bytes)")]
    FieldOutOfRange {
        class: String,
        field: String,
        offset: u32,
        size: u32,
        class_size: u32,
    },
    #[error("Cannot build an array of zero-sized {0}")]
    ZeroSizedElement(String),
    #[error("Unknown field {field} in {class}")]
    UnknownField { class: String, field: String },
    #[error("Unknown method {method} in {class}")]
    UnknownMethod { class: String, method: String },
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}
