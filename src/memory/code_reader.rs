// Wed Oct 14 2026 - Alex

use crate::memory::{page, Address, MemoryAccessor};

/// Copies machine code starting at an arbitrary address, one page at a time,
/// stopping at the first page that is not executable or cannot be copied.
pub struct CodeReader<'a> {
    accessor: &'a dyn MemoryAccessor,
    max_len: usize,
}

impl<'a> CodeReader<'a> {
    pub fn new(accessor: &'a dyn MemoryAccessor, max_len: usize) -> Self {
        Self { accessor, max_len }
    }

    pub fn read(&self, start: Address) -> Vec<u8> {
        let page_size = self.accessor.page_size();
        let mut code = Vec::new();
        let mut current = start;

        while code.len() < self.max_len {
            if !self.accessor.can_execute(current) {
                break;
            }

            let chunk = (page::rest_of_page(current, page_size) as usize).min(self.max_len - code.len());
            match self.accessor.read_bytes(current, chunk) {
                Ok(bytes) => code.extend_from_slice(&bytes),
                Err(e) => {
                    log::trace!("code read stopped at {}: {}", current, e);
                    break;
                }
            }
            current = current + chunk as u64;
        }

        code
    }
}
