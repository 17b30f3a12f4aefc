// Tue Oct 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Address 0x{0:x} is not readable")]
    Unreadable(u64),
    #[error("Short read at 0x{address:x}: wanted {wanted} bytes, got {got}")]
    ShortRead { address: u64, wanted: usize, got: usize },
    #[error("Invalid memory range")]
    InvalidRange,
    #[error("Process not found: {0}")]
    ProcessNotFound(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
}
