// Wed Oct 14 2026 - Alex

pub mod container;
pub mod data;
pub mod error;

pub use container::{DatabaseIndex, InstanceRef, KnownAddressDatabase};
pub use data::{ClassEntry, DatasetAddress, InstanceEntry, NameDatabase, VirtualTableEntry};
pub use error::DatabaseError;
