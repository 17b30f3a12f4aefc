// Thu Oct 15 2026 - Alex

use crate::memory::MemoryRange;
use crate::structure::{ClassDescriptor, ClassKind, FieldDescriptor, FieldKind, StructureError};
use std::sync::Arc;

/// Field layouts a pseudo class can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    None,
    /// The whole extent as one array of `f32`.
    SingleArray,
}

/// A class whose size the caller already knows.
pub fn generate(name: &str, size: u32, template: Template, kind: ClassKind) -> ClassDescriptor {
    let mut class = ClassDescriptor::new(name, kind);
    class.estimated_size = size;
    class.size_from_context = Some(size);
    if template == Template::SingleArray {
        class.set_fields(vec![FieldDescriptor::new("Data", 0, size, FieldKind::Single)]);
    }
    class
}

/// Placeholder for memory that cannot be typed: the bytes up to the end of its page.
pub fn rest_of_page(size: u32) -> ClassDescriptor {
    ClassDescriptor {
        estimated_size: size,
        ..ClassDescriptor::default()
    }
}

/// `length` consecutive `element` objects.
pub fn generate_array(element: Arc<ClassDescriptor>, length: u32) -> Result<ClassDescriptor, StructureError> {
    if element.estimated_size == 0 {
        return Err(StructureError::ZeroSizedElement(element.name.clone()));
    }

    let size = element.estimated_size.saturating_mul(length);
    let mut class = ClassDescriptor::new(&format!("{}[{}]", element.name, length), ClassKind::Regular);
    class.estimated_size = size;
    class.size_from_context = Some(size);
    class.set_fields(vec![
        FieldDescriptor::new("Elements", 0, size, FieldKind::ObjectArray).with_element_class(element),
    ]);
    Ok(class)
}

/// The stack of a thread, sized by its mapping.
pub fn thread_stack(name: &str, range: &MemoryRange) -> ClassDescriptor {
    let size = u32::try_from(range.size()).unwrap_or(u32::MAX);
    generate(name, size, Template::None, ClassKind::ThreadStack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Address;
    use crate::structure::SizeProvenance;

    #[test]
    fn test_single_array_template() {
        let class = generate("Matrix", 64, Template::SingleArray, ClassKind::Regular);
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].element_count(), 16);
        assert_eq!(class.size_provenance(), SizeProvenance::OuterContext);
        assert!(generate("Blob", 64, Template::None, ClassKind::Regular).fields.is_empty());
    }

    #[test]
    fn test_generate_array() {
        let mut element = ClassDescriptor::new("Item", ClassKind::Regular);
        element.estimated_size = 0x18;
        let array = generate_array(Arc::new(element), 4).unwrap();
        assert_eq!(array.name, "Item[4]");
        assert_eq!(array.estimated_size, 0x60);
        assert_eq!(array.fields[0].element_count(), 4);

        let zero = Arc::new(ClassDescriptor::new("Empty", ClassKind::Regular));
        assert!(matches!(generate_array(zero, 4), Err(StructureError::ZeroSizedElement(_))));
    }

    #[test]
    fn test_rest_of_page_and_stack() {
        let page = rest_of_page(0x123);
        assert_eq!(page.estimated_size, 0x123);
        assert_eq!(page.size_provenance(), SizeProvenance::RestOfPage);

        let stack = thread_stack("Stack", &MemoryRange::from_start_size(Address::new(0x7000_0000), 0x10000));
        assert_eq!(stack.kind, ClassKind::ThreadStack);
        assert_eq!(stack.estimated_size, 0x10000);
    }
}
