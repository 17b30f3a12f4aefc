// Wed Oct 14 2026 - Alex

pub mod registry;
pub mod types;

pub use registry::{StaticSchemaRegistry, TypeSchemaRegistry};
pub use types::{ArrayElement, MethodFn, MethodTable, SchemaField, SchemaFieldKind, TypeSchema};
