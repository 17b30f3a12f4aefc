// Thu Oct 15 2026 - Alex

use crate::schema::{ArrayElement, SchemaFieldKind, TypeSchema, TypeSchemaRegistry};
use crate::structure::{ClassDescriptor, FieldDescriptor, FieldKind};
use std::sync::Arc;

const MAX_NESTING: u32 = 16;

/// Turns a schema into the flat field list of a class.
///
/// Nested value members contribute an `Object` field plus their own fields, prefixed
/// with `Member.`. Members holding a base class contribute nothing themselves: the
/// outer type redeclares the base's fields, so only bases of bases are descended into.
pub struct SchemaFlattener<'a> {
    schemas: &'a dyn TypeSchemaRegistry,
    resolve_class: &'a dyn Fn(&str) -> Arc<ClassDescriptor>,
}

impl<'a> SchemaFlattener<'a> {
    pub fn new(schemas: &'a dyn TypeSchemaRegistry, resolve_class: &'a dyn Fn(&str) -> Arc<ClassDescriptor>) -> Self {
        Self { schemas, resolve_class }
    }

    pub fn flatten(&self, schema: &TypeSchema) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();
        self.visit(schema, 0, "", false, 0, &mut fields);
        fields
    }

    fn visit(
        &self,
        schema: &TypeSchema,
        base: u32,
        prefix: &str,
        inherited: bool,
        depth: u32,
        out: &mut Vec<FieldDescriptor>,
    ) {
        if depth > MAX_NESTING {
            log::debug!("schema {} nested too deeply, fields cut off", schema.name);
            return;
        }

        for field in schema.fields.iter().filter(|f| !f.ignored) {
            let name = format!("{}{}", prefix, field.name);
            let offset = base + field.offset;

            match &field.kind {
                SchemaFieldKind::Scalar(kind) => {
                    if !inherited {
                        let size = if field.size == 0 {
                            kind.scalar_size().unwrap_or_default()
                        } else {
                            field.size
                        };
                        out.push(FieldDescriptor::new(&name, offset, size, *kind));
                    }
                }
                SchemaFieldKind::FixedArray { element, .. } => {
                    if inherited {
                        continue;
                    }
                    match element {
                        ArrayElement::Scalar { kind, is_string } => {
                            let kind = if *is_string { kind.as_string() } else { *kind };
                            out.push(FieldDescriptor::new(&name, offset, field.size, kind));
                        }
                        ArrayElement::Type(type_name) => {
                            let class = (self.resolve_class)(type_name);
                            out.push(
                                FieldDescriptor::new(&name, offset, field.size, FieldKind::ObjectArray)
                                    .with_element_class(class),
                            );
                        }
                    }
                }
                SchemaFieldKind::Nested {
                    type_name,
                    inherited: is_base,
                } => {
                    if inherited && !is_base {
                        continue;
                    }
                    if !is_base {
                        let class = (self.resolve_class)(type_name);
                        out.push(FieldDescriptor::new(&name, offset, field.size, FieldKind::Object).with_element_class(class));
                    }
                    match self.schemas.lookup(type_name) {
                        Some(nested) => {
                            let prefix = format!("{}.", name);
                            self.visit(&nested, offset, &prefix, *is_base, depth + 1, out);
                        }
                        None => log::trace!("no schema for nested type {}", type_name),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaField, StaticSchemaRegistry};
    use crate::structure::ClassKind;

    fn registry() -> StaticSchemaRegistry {
        StaticSchemaRegistry::new()
            .with(
                TypeSchema::new("Vec3", 12)
                    .with_field(SchemaField::scalar("X", 0, FieldKind::Single))
                    .with_field(SchemaField::scalar("Y", 4, FieldKind::Single))
                    .with_field(SchemaField::scalar("Z", 8, FieldKind::Single)),
            )
            .with(
                TypeSchema::new("Object", 0x10)
                    .with_field(SchemaField::scalar("VirtualTable", 0, FieldKind::Pointer))
                    .with_field(SchemaField::scalar("Id", 8, FieldKind::UInt32)),
            )
            .with(
                TypeSchema::new("Actor", 0x40)
                    .with_field(SchemaField::base("Object", 0, 0x10, "Object"))
                    .with_field(SchemaField::scalar("VirtualTable", 0, FieldKind::Pointer))
                    .with_field(SchemaField::scalar("Id", 8, FieldKind::UInt32))
                    .with_field(SchemaField::nested("Position", 0x10, 12, "Vec3"))
                    .with_field(SchemaField::scalar_array("Name", 0x1c, FieldKind::Byte, 16, true))
                    .with_field(SchemaField::object_array("Waypoints", 0x2c, 0x18, "Vec3", 2).ignore())
                    .with_field(SchemaField::object_array("Offsets", 0x2c, 0x0c, "Vec3", 1)),
            )
    }

    #[test]
    fn test_flatten_nested_and_inherited() {
        let registry = registry();
        let resolve = |name: &str| {
            let mut class = ClassDescriptor::new(name, ClassKind::Regular);
            class.estimated_size = 12;
            Arc::new(class)
        };
        let flattener = SchemaFlattener::new(&registry, &resolve);
        let actor = registry.lookup("Actor").unwrap();
        let fields = flattener.flatten(&actor);

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["VirtualTable", "Id", "Position", "Position.X", "Position.Y", "Position.Z", "Name", "Offsets"]
        );

        let position_y = &fields[4];
        assert_eq!(position_y.offset, 0x14);
        assert_eq!(fields[2].kind, FieldKind::Object);
        assert_eq!(fields[2].element_class.as_ref().unwrap().name, "Vec3");
        assert_eq!(fields[6].kind, FieldKind::ByteString);
        assert_eq!(fields[7].kind, FieldKind::ObjectArray);
    }
}
