// Thu Oct 15 2026 - Alex

pub mod class_id;
pub mod class_info;
pub mod error;
pub mod field;
pub mod highlight;
pub mod pseudo;
pub mod registry;
pub mod schema_fields;
pub mod value;
pub mod vtable;

pub use class_id::{ClassIdentifier, ClassIdentifierKind};
pub use class_info::{ClassDescriptor, ClassKind, SizeProvenance};
pub use error::StructureError;
pub use field::{FieldDescriptor, FieldKind};
pub use highlight::{HexColor, Highlighter};
pub use pseudo::Template;
pub use registry::{ClassRegistry, Collaborators};
pub use schema_fields::SchemaFlattener;
pub use value::{half_to_f32, read_field, read_value, FieldValue, ObjectView};
pub use vtable::{slot_fields, VirtualTableWalker};
