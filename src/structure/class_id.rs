// Wed Oct 14 2026 - Alex

use crate::memory::Address;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassIdentifierKind {
    /// A dataset instance living at the address.
    WellKnownObject,
    /// The object a dataset pointer-instance currently points at.
    WellKnownObjectByPointer,
    /// An object whose first word is the given vtable.
    ObjectWithVirtualTable,
    VirtualTable,
    Function,
}

/// What a class name is derived from: the kind of evidence plus the address it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassIdentifier {
    pub kind: ClassIdentifierKind,
    pub address: Address,
}

impl ClassIdentifier {
    pub fn new(kind: ClassIdentifierKind, address: Address) -> Self {
        Self { kind, address }
    }

    pub fn is_object(&self) -> bool {
        matches!(
            self.kind,
            ClassIdentifierKind::WellKnownObject
                | ClassIdentifierKind::WellKnownObjectByPointer
                | ClassIdentifierKind::ObjectWithVirtualTable
        )
    }
}

impl fmt::Display for ClassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:X})", self.kind, self.address)
    }
}
