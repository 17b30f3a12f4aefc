// Wed Oct 14 2026 - Alex

use crate::memory::{Address, MemoryAccessor, MemoryRegion};
use crate::pattern::Pattern;
use rayon::prelude::*;

pub struct PatternScanner {
    chunk_size: usize,
    use_parallel: bool,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternScanner {
    pub fn new() -> Self {
        Self {
            chunk_size: 0x10000,
            use_parallel: true,
        }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn use_parallel(mut self, parallel: bool) -> Self {
        self.use_parallel = parallel;
        self
    }

    /// Scans every readable region and returns match addresses in ascending order.
    pub fn scan(&self, accessor: &dyn MemoryAccessor, pattern: &Pattern, regions: &[MemoryRegion]) -> Vec<Address> {
        let overlap = pattern.len().saturating_sub(1);
        let step = self.chunk_size.saturating_sub(overlap).max(1);

        let chunks: Vec<(Address, usize)> = regions
            .iter()
            .filter(|r| r.is_readable())
            .flat_map(|region| {
                let start = region.start();
                let size = region.size() as usize;
                let chunk_size = self.chunk_size;
                (0..size)
                    .step_by(step)
                    .map(move |offset| (start + offset as u64, (size - offset).min(chunk_size)))
            })
            .collect();

        let scan_chunk = |&(addr, len): &(Address, usize)| -> Vec<Address> {
            match accessor.read_bytes(addr, len) {
                Ok(data) => pattern
                    .find_all_in(&data)
                    .into_iter()
                    .map(|offset| addr + offset as u64)
                    .collect(),
                Err(e) => {
                    log::trace!("skipping chunk at {}: {}", addr, e);
                    Vec::new()
                }
            }
        };

        let mut results: Vec<Address> = if self.use_parallel {
            chunks.par_iter().flat_map_iter(scan_chunk).collect()
        } else {
            chunks.iter().flat_map(scan_chunk).collect()
        };

        results.sort();
        results.dedup();
        results
    }

    /// Scans only executable regions.
    pub fn scan_code(&self, accessor: &dyn MemoryAccessor, pattern: &Pattern) -> Vec<Address> {
        let regions: Vec<MemoryRegion> = accessor.regions().into_iter().filter(|r| r.is_executable()).collect();
        self.scan(accessor, pattern, &regions)
    }
}
