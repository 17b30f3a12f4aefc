// Fri Oct 16 2026 - Alex

pub mod analysis;
pub mod cli;
pub mod config;
pub mod database;
pub mod identify;
pub mod inspector;
pub mod memory;
pub mod pattern;
pub mod schema;
pub mod structure;
pub mod symbol;
pub mod utils;

pub use analysis::{FunctionAnalyzer, FunctionBody, FunctionInstruction, MemoryHeuristics};
pub use config::Config;
pub use database::{KnownAddressDatabase, NameDatabase};
pub use identify::{AddressIdentification, AddressIdentifier, AddressType};
pub use inspector::{Classification, Inspector, ObjectClassifier};
pub use memory::{Address, MemoryAccessor, SnapshotMemory};
pub use structure::{ClassDescriptor, ClassRegistry, FieldDescriptor, FieldValue};
pub use symbol::{ModuleSymbolResolver, SymbolTable};
