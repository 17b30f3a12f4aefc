// Wed Oct 14 2026 - Alex

use crate::memory::{
    Address, MemoryAccessor, MemoryError, MemoryRange, MemoryRegion, PageInfo, Protection, RegionKind,
};
use libc::{c_void, iovec, pid_t};
use parking_lot::RwLock;
use std::fs;

/// One line of `/proc/<pid>/maps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsEntry {
    pub start: u64,
    pub end: u64,
    pub protection: Protection,
    pub offset: u64,
    pub path: String,
}

impl MapsEntry {
    pub fn kind(&self) -> RegionKind {
        if self.path == "[stack]" || self.path.starts_with("[stack:") {
            RegionKind::Stack
        } else if self.path.starts_with('/') {
            RegionKind::Image
        } else if self.path.is_empty() || self.path.starts_with('[') {
            RegionKind::Private
        } else {
            RegionKind::Mapped
        }
    }

    pub fn to_region(&self) -> MemoryRegion {
        MemoryRegion::new(
            MemoryRange::new(Address::new(self.start), Address::new(self.end)),
            self.protection,
            self.path.clone(),
        )
        .with_kind(self.kind())
    }
}

pub fn parse_maps(content: &str) -> Vec<MapsEntry> {
    content.lines().filter_map(parse_maps_line).collect()
}

fn parse_maps_line(line: &str) -> Option<MapsEntry> {
    let mut parts = line.split_whitespace();
    let range = parts.next()?;
    let perms = parts.next()?;
    let offset = u64::from_str_radix(parts.next()?, 16).ok()?;
    let _dev = parts.next()?;
    let _inode = parts.next()?;
    let path = parts.collect::<Vec<_>>().join(" ");

    let (start, end) = range.split_once('-')?;
    Some(MapsEntry {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        protection: Protection::from_perms(perms),
        offset,
        path,
    })
}

/// Live process memory on Linux, read through `process_vm_readv`.
///
/// Page queries answer from a copy of `/proc/<pid>/maps` taken at attach time;
/// call [`ProcessMemory::refresh_regions`] after the target maps or unmaps memory.
pub struct ProcessMemory {
    pid: pid_t,
    regions: RwLock<Vec<MemoryRegion>>,
}

impl ProcessMemory {
    pub fn attach(pid: pid_t) -> Result<Self, MemoryError> {
        let process = Self {
            pid,
            regions: RwLock::new(Vec::new()),
        };
        process.refresh_regions()?;
        log::debug!("attached to process {} ({} regions)", pid, process.regions.read().len());
        Ok(process)
    }

    pub fn attach_by_name(name: &str) -> Result<Self, MemoryError> {
        let pid = Self::find_process_by_name(name)?
            .ok_or_else(|| MemoryError::ProcessNotFound(name.to_string()))?;
        Self::attach(pid)
    }

    pub fn find_process_by_name(name: &str) -> Result<Option<pid_t>, MemoryError> {
        for entry in fs::read_dir("/proc")? {
            let entry = entry?;
            let pid = match entry.file_name().to_str().and_then(|s| s.parse::<pid_t>().ok()) {
                Some(pid) => pid,
                None => continue,
            };
            if let Ok(comm) = fs::read_to_string(entry.path().join("comm")) {
                if comm.trim() == name {
                    return Ok(Some(pid));
                }
            }
        }
        Ok(None)
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn refresh_regions(&self) -> Result<(), MemoryError> {
        let content = fs::read_to_string(format!("/proc/{}/maps", self.pid)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MemoryError::ProcessNotFound(self.pid.to_string())
            } else {
                MemoryError::Io(e)
            }
        })?;
        let mut regions: Vec<MemoryRegion> = parse_maps(&content).iter().map(MapsEntry::to_region).collect();
        regions.sort_by_key(|r| r.start());
        *self.regions.write() = regions;
        Ok(())
    }

    pub fn maps(&self) -> Result<Vec<MapsEntry>, MemoryError> {
        Ok(parse_maps(&fs::read_to_string(format!("/proc/{}/maps", self.pid))?))
    }

    fn region_at(&self, addr: Address) -> Option<MemoryRegion> {
        let regions = self.regions.read();
        let idx = regions.partition_point(|r| r.start() <= addr);
        if idx == 0 {
            return None;
        }
        let region = &regions[idx - 1];
        region.contains(addr).then(|| region.clone())
    }
}

impl MemoryAccessor for ProcessMemory {
    fn query(&self, addr: Address) -> PageInfo {
        self.region_at(addr).map(|r| r.page_info()).unwrap_or_else(PageInfo::unmapped)
    }

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Ok(());
        }

        let local = iovec {
            iov_base: buf.as_mut_ptr() as *mut c_void,
            iov_len: buf.len(),
        };
        let remote = iovec {
            iov_base: addr.as_u64() as *mut c_void,
            iov_len: buf.len(),
        };

        // SAFETY: `local` points into `buf`, which outlives the call; the kernel
        // validates the remote range and reports failure instead of faulting.
        let read = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };
        if read < 0 {
            return Err(MemoryError::Unreadable(addr.as_u64()));
        }
        if read as usize != buf.len() {
            return Err(MemoryError::ShortRead {
                address: addr.as_u64(),
                wanted: buf.len(),
                got: read as usize,
            });
        }
        Ok(())
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.regions.read().clone()
    }

    fn page_size(&self) -> u64 {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as u64
        } else {
            crate::memory::page::DEFAULT_PAGE_SIZE
        }
    }
}
