// Wed Oct 14 2026 - Alex

use bitflags::bitflags;

bitflags! {
    /// Kinds of well-known addresses, also used as a filter when identifying.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AddressType: u8 {
        const INSTANCE = 1;
        const VIRTUAL_TABLE = 2;
        const FUNCTION = 4;
        const GLOBAL = 8;
        const ALL = Self::INSTANCE.bits() | Self::VIRTUAL_TABLE.bits() | Self::FUNCTION.bits() | Self::GLOBAL.bits();
    }
}
