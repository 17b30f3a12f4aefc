// Wed Oct 14 2026 - Alex

use crate::memory::{page, Address, MemoryError, MemoryRegion, PageInfo};

/// Read-only view over the memory of the inspected process.
///
/// Implementations must never fault: an address that cannot be copied reports
/// [`MemoryError::Unreadable`] and its page reports `committed == false` or a
/// protection without read access.
pub trait MemoryAccessor: Send + Sync {
    fn query(&self, addr: Address) -> PageInfo;

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn regions(&self) -> Vec<MemoryRegion>;

    fn page_size(&self) -> u64 {
        page::DEFAULT_PAGE_SIZE
    }

    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }

    fn read_u8(&self, addr: Address) -> Result<u8, MemoryError> {
        let mut buf = [0u8; 1];
        self.read_into(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, addr: Address) -> Result<u16, MemoryError> {
        let mut buf = [0u8; 2];
        self.read_into(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let mut buf = [0u8; 4];
        self.read_into(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let mut buf = [0u8; 8];
        self.read_into(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        Ok(Address::new(self.read_u64(addr)?))
    }

    fn can_read(&self, addr: Address) -> bool {
        self.query(addr).can_read()
    }

    fn can_execute(&self, addr: Address) -> bool {
        self.query(addr).can_execute()
    }

    /// Bytes between `addr` and the next page boundary.
    fn rest_of_page(&self, addr: Address) -> u64 {
        page::rest_of_page(addr, self.page_size())
    }
}
