// Thu Oct 15 2026 - Alex

use crate::analysis::{FunctionBody, SizeAndDisplacement};
use crate::memory::{Address, MemoryAccessor};
use crate::schema::TypeSchema;
use crate::structure::{FieldDescriptor, FieldKind, FieldValue, StructureError};
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

static EMPTY: Lazy<Arc<ClassDescriptor>> = Lazy::new(|| Arc::new(ClassDescriptor::default()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClassKind {
    #[default]
    Regular,
    VirtualTable,
    Function,
    ThreadStack,
}

/// Which source settled a descriptor's `estimated_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeProvenance {
    /// Nothing is known, not even the containing page.
    Unknown,
    /// Bytes left in the page, the last resort.
    RestOfPage,
    /// The `mov r32, size` before the dealloc call in a destructor.
    Destructor,
    /// A declared type layout.
    Schema,
    /// The caller knew the extent: a vtable walk, a decoded function, a stack or array.
    OuterContext,
}

/// An inferred or known type. Built once per name and shared through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ClassDescriptor {
    pub name: String,
    pub defining_module: Option<String>,
    pub kind: ClassKind,
    pub estimated_size: u32,
    pub size_from_destructor: Option<u32>,
    pub size_from_schema: Option<u32>,
    pub size_from_context: Option<u32>,
    pub fields: Vec<FieldDescriptor>,
    /// Dataset parent chain, nearest first.
    pub parents: Vec<String>,
    /// Only for virtual tables: size of the owning object and where this table sits in it.
    pub vtable_owner: Option<SizeAndDisplacement>,
    /// Only for functions.
    pub function: Option<FunctionBody>,
    pub schema: Option<Arc<TypeSchema>>,
}

impl ClassDescriptor {
    /// The shared "nothing here" descriptor.
    pub fn empty() -> Arc<Self> {
        EMPTY.clone()
    }

    pub fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.estimated_size == 0 && self.fields.is_empty()
    }

    /// Named after something other than its vtable address.
    pub fn is_known(&self) -> bool {
        !self.name.is_empty() && !self.name.starts_with("Cls_")
    }

    pub fn is_class(&self) -> bool {
        self.is_known() || self.size_from_destructor.is_some()
    }

    pub fn size_provenance(&self) -> SizeProvenance {
        if self.size_from_context.is_some() {
            return SizeProvenance::OuterContext;
        }
        match (self.size_from_destructor, self.size_from_schema) {
            (Some(dtor), Some(schema)) if dtor > schema => SizeProvenance::Destructor,
            (_, Some(_)) => SizeProvenance::Schema,
            (Some(_), None) => SizeProvenance::Destructor,
            (None, None) if self.estimated_size > 0 => SizeProvenance::RestOfPage,
            (None, None) => SizeProvenance::Unknown,
        }
    }

    /// Settles `estimated_size` from the heuristic sources, or `rest_of_page` when none produced one.
    pub fn aggregate_size(&mut self, rest_of_page: u32) {
        self.estimated_size = match (self.size_from_destructor, self.size_from_schema) {
            (None, None) => rest_of_page,
            (dtor, schema) => dtor.unwrap_or(0).max(schema.unwrap_or(0)),
        };
    }

    /// Replaces the field list, sorted and cleaned of generated duplicates.
    pub fn set_fields(&mut self, fields: Vec<FieldDescriptor>) {
        self.fields = normalize_fields(fields);
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields overlapping `[offset, offset + size)`.
    pub fn fields_at(&self, offset: u32, size: u32) -> impl Iterator<Item = &FieldDescriptor> {
        let end = offset as u64 + size as u64;
        self.fields
            .iter()
            .filter(move |f| (f.offset as u64) < end && f.end() > offset as u64)
    }

    pub fn method_names(&self) -> Vec<&str> {
        match &self.schema {
            Some(schema) => schema.methods.names().collect(),
            None => Vec::new(),
        }
    }

    /// Calls a member function registered with this type's schema on the object at `addr`.
    pub fn invoke(&self, method: &str, memory: &dyn MemoryAccessor, addr: Address) -> Result<FieldValue, StructureError> {
        let function = self
            .schema
            .as_ref()
            .and_then(|s| s.methods.get(method))
            .ok_or_else(|| StructureError::UnknownMethod {
                class: self.name.clone(),
                method: method.to_string(),
            })?;
        Ok(function(memory, addr)?)
    }
}

impl fmt::Display for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "<unknown>" } else { self.name.as_str() };
        write!(f, "{} (0x{:x} bytes, {:?})", name, self.estimated_size, self.size_provenance())
    }
}

fn is_scalar(kind: FieldKind) -> bool {
    !matches!(kind, FieldKind::Object | FieldKind::ObjectArray)
}

/// Sorts by offset, then larger first, then name; drops generated names that duplicate a
/// declared field at the same place, and scalars overlapping an earlier scalar.
fn normalize_fields(fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    let mut sorted: Vec<FieldDescriptor> = fields
        .into_iter()
        .sorted_by(FieldDescriptor::layout_order)
        .dedup_by(|a, b| a.name == b.name && a.offset == b.offset)
        .collect();

    let declared: Vec<(u32, u32)> = sorted
        .iter()
        .filter(|f| !f.is_synthetic())
        .map(|f| (f.offset, f.size))
        .collect();
    sorted.retain(|f| !f.is_synthetic() || !declared.contains(&(f.offset, f.size)));

    let mut scalar_end = 0u64;
    sorted.retain(|f| {
        if !is_scalar(f.kind) {
            return true;
        }
        if (f.offset as u64) < scalar_end {
            log::trace!("dropping overlapping field {}", f);
            return false;
        }
        scalar_end = f.end();
        true
    });
    sorted
}
