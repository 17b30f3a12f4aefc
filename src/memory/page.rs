// Tue Oct 13 2026 - Alex

use crate::memory::Address;

pub const DEFAULT_PAGE_SIZE: u64 = 0x1000;

pub fn page_base(addr: Address, page_size: u64) -> Address {
    addr.align_down(page_size)
}

pub fn next_page(addr: Address, page_size: u64) -> Address {
    Address::new((addr.as_u64().wrapping_add(page_size)) & !(page_size - 1))
}

pub fn rest_of_page(addr: Address, page_size: u64) -> u64 {
    page_size - (addr.as_u64() & (page_size - 1))
}
