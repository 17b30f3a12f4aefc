// Tue Oct 13 2026 - Alex

pub mod address;
pub mod code_reader;
pub mod error;
pub mod page;
#[cfg(target_os = "linux")]
pub mod process;
pub mod protection;
pub mod range;
pub mod region;
pub mod snapshot;
pub mod traits;

pub use address::{Address, POINTER_SIZE};
pub use code_reader::CodeReader;
pub use error::MemoryError;
#[cfg(target_os = "linux")]
pub use process::ProcessMemory;
pub use protection::{PageInfo, Protection, RegionKind};
pub use range::MemoryRange;
pub use region::MemoryRegion;
pub use snapshot::SnapshotMemory;
pub use traits::MemoryAccessor;
