// Tue Oct 13 2026 - Alex

use crate::memory::{Address, MemoryRange, PageInfo, Protection, RegionKind};
use std::fmt;

#[derive(Debug, Clone)]
pub struct MemoryRegion {
    range: MemoryRange,
    protection: Protection,
    kind: RegionKind,
    name: String,
}

impl MemoryRegion {
    pub fn new(range: MemoryRange, protection: Protection, name: String) -> Self {
        Self {
            range,
            protection,
            kind: RegionKind::Private,
            name,
        }
    }

    pub fn with_kind(mut self, kind: RegionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn range(&self) -> &MemoryRange {
        &self.range
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Backing file or pseudo-path (`[stack]`, `[heap]`), empty for anonymous memory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> Address {
        self.range.start()
    }

    pub fn end(&self) -> Address {
        self.range.end()
    }

    pub fn size(&self) -> u64 {
        self.range.size()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    pub fn page_info(&self) -> PageInfo {
        PageInfo::committed(self.protection, self.kind)
    }

    pub fn is_executable(&self) -> bool {
        self.protection.can_execute()
    }

    pub fn is_readable(&self) -> bool {
        self.protection.can_read()
    }

    pub fn is_code(&self) -> bool {
        self.is_readable() && self.is_executable() && !self.protection.can_write()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?} {}", self.range, self.protection, self.kind, self.name)
    }
}
