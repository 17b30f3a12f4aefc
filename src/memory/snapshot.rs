// Wed Oct 14 2026 - Alex

use crate::memory::{
    page, Address, MemoryAccessor, MemoryError, MemoryRange, MemoryRegion, PageInfo, Protection, RegionKind,
};
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

struct SnapshotPage {
    data: Box<[u8]>,
    info: PageInfo,
}

/// Page-granular copy of (part of) an address space.
///
/// Used for offline dumps and as the fake process in tests. Pages that were
/// never added report as uncommitted.
pub struct SnapshotMemory {
    page_size: u64,
    pages: BTreeMap<u64, SnapshotPage>,
    regions: Vec<MemoryRegion>,
}

impl SnapshotMemory {
    pub fn new(page_size: u64) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self {
            page_size,
            pages: BTreeMap::new(),
            regions: Vec::new(),
        }
    }

    /// Maps `bytes` at `start`. Partially covered pages are zero-filled.
    pub fn add_region(&mut self, start: Address, bytes: &[u8], protection: Protection, kind: RegionKind, name: &str) {
        let page_size = self.page_size;
        let first = page::page_base(start, page_size);
        let end = start + bytes.len() as u64;
        let mut current = first;
        while current < end {
            self.pages.entry(current.as_u64()).or_insert_with(|| SnapshotPage {
                data: vec![0u8; page_size as usize].into_boxed_slice(),
                info: PageInfo::committed(protection, kind),
            });
            current = current + page_size;
        }
        let range = MemoryRange::new(first, current);
        self.regions
            .push(MemoryRegion::new(range, protection, name.to_string()).with_kind(kind));
        self.patch(start, bytes);
    }

    /// Maps `size` zero bytes at `start`.
    pub fn add_zeroed(&mut self, start: Address, size: u64, protection: Protection, kind: RegionKind, name: &str) {
        self.add_region(start, &vec![0u8; size as usize], protection, kind, name);
    }

    /// Maps the content of a raw dump file at `base`.
    pub fn load_dump(
        &mut self,
        path: &Path,
        base: Address,
        protection: Protection,
        kind: RegionKind,
    ) -> Result<(), MemoryError> {
        let file = File::open(path)?;
        // SAFETY: the mapping is only read while `mmap` is alive and copied into owned pages.
        let mmap = unsafe { Mmap::map(&file)? };
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        self.add_region(base, &mmap[..], protection, kind, &name);
        Ok(())
    }

    /// Overwrites bytes of already mapped pages; bytes falling on unmapped pages are dropped.
    pub fn patch(&mut self, start: Address, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            let addr = start + i as u64;
            let base = page::page_base(addr, self.page_size).as_u64();
            if let Some(page) = self.pages.get_mut(&base) {
                page.data[(addr.as_u64() - base) as usize] = *byte;
            }
        }
    }

    pub fn patch_u64(&mut self, start: Address, value: u64) {
        self.patch(start, &value.to_le_bytes());
    }

    pub fn set_protection(&mut self, start: Address, protection: Protection) {
        let base = page::page_base(start, self.page_size).as_u64();
        if let Some(page) = self.pages.get_mut(&base) {
            page.info.protection = protection;
        }
    }
}

impl MemoryAccessor for SnapshotMemory {
    fn query(&self, addr: Address) -> PageInfo {
        let base = page::page_base(addr, self.page_size).as_u64();
        self.pages.get(&base).map(|p| p.info).unwrap_or_else(PageInfo::unmapped)
    }

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let mut copied = 0usize;
        while copied < buf.len() {
            let current = addr + copied as u64;
            let base = page::page_base(current, self.page_size).as_u64();
            let page = self
                .pages
                .get(&base)
                .filter(|p| p.info.can_read())
                .ok_or(MemoryError::Unreadable(current.as_u64()))?;
            let offset = (current.as_u64() - base) as usize;
            let chunk = (self.page_size as usize - offset).min(buf.len() - copied);
            buf[copied..copied + chunk].copy_from_slice(&page.data[offset..offset + chunk]);
            copied += chunk;
        }
        Ok(())
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.regions.clone()
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}
