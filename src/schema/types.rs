// Wed Oct 14 2026 - Alex

use crate::memory::{Address, MemoryAccessor, MemoryError};
use crate::structure::{FieldKind, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A member function callable on an object of a known type.
pub type MethodFn = fn(&dyn MemoryAccessor, Address) -> Result<FieldValue, MemoryError>;

/// Named member functions of a type, registered once together with its schema.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: IndexMap<String, MethodFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, method: MethodFn) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }

    pub fn get(&self, name: &str) -> Option<MethodFn> {
        self.methods.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods.keys()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayElement {
    Scalar { kind: FieldKind, is_string: bool },
    Type(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaFieldKind {
    Scalar(FieldKind),
    /// An embedded value of another known type. `inherited` marks the member that
    /// holds the base class, whose own fields are already declared on the outer type.
    Nested { type_name: String, inherited: bool },
    FixedArray { element: ArrayElement, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub kind: SchemaFieldKind,
    /// Declared for layout only, never shown.
    #[serde(default)]
    pub ignored: bool,
}

impl SchemaField {
    pub fn scalar(name: &str, offset: u32, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            offset,
            size: kind.scalar_size().unwrap_or_default(),
            kind: SchemaFieldKind::Scalar(kind),
            ignored: false,
        }
    }

    pub fn nested(name: &str, offset: u32, size: u32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            offset,
            size,
            kind: SchemaFieldKind::Nested {
                type_name: type_name.to_string(),
                inherited: false,
            },
            ignored: false,
        }
    }

    pub fn base(name: &str, offset: u32, size: u32, type_name: &str) -> Self {
        Self {
            kind: SchemaFieldKind::Nested {
                type_name: type_name.to_string(),
                inherited: true,
            },
            ..Self::nested(name, offset, size, type_name)
        }
    }

    pub fn scalar_array(name: &str, offset: u32, kind: FieldKind, count: u32, is_string: bool) -> Self {
        Self {
            name: name.to_string(),
            offset,
            size: kind.scalar_size().unwrap_or_default() * count,
            kind: SchemaFieldKind::FixedArray {
                element: ArrayElement::Scalar { kind, is_string },
                count,
            },
            ignored: false,
        }
    }

    pub fn object_array(name: &str, offset: u32, size: u32, type_name: &str, count: u32) -> Self {
        Self {
            name: name.to_string(),
            offset,
            size,
            kind: SchemaFieldKind::FixedArray {
                element: ArrayElement::Type(type_name.to_string()),
                count,
            },
            ignored: false,
        }
    }

    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// Declarative layout of a known compiled type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSchema {
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(skip)]
    pub methods: MethodTable,
}

impl TypeSchema {
    pub fn new(name: &str, size: u32) -> Self {
        Self {
            name: name.to_string(),
            size,
            fields: Vec::new(),
            methods: MethodTable::new(),
        }
    }

    pub fn with_field(mut self, field: SchemaField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, name: &str, method: MethodFn) -> Self {
        self.methods = self.methods.with(name, method);
        self
    }
}
