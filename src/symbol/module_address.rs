// Wed Oct 14 2026 - Alex

use crate::memory::Address;
use std::fmt;

/// An address expressed relative to the module (and nearest symbol) containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAddress {
    pub module: String,
    pub symbol: Option<String>,
    /// Offset from the symbol when there is one, otherwise from the module base.
    pub displacement: u64,
    pub original: Address,
}

impl ModuleAddress {
    pub fn new(module: &str, symbol: Option<&str>, displacement: u64, original: Address) -> Self {
        Self {
            module: module.to_string(),
            symbol: symbol.map(str::to_string),
            displacement,
            original,
        }
    }

    /// Start of the symbol (or module) this address is relative to.
    pub fn base(&self) -> Address {
        self.original - self.displacement
    }

    pub fn has_symbol(&self) -> bool {
        self.symbol.is_some()
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.symbol, self.displacement) {
            (Some(symbol), 0) => write!(f, "{}!{}", self.module, symbol),
            (Some(symbol), disp) => write!(f, "{}!{}+0x{:x}", self.module, symbol, disp),
            (None, disp) => write!(f, "{}+0x{:x}", self.module, disp),
        }
    }
}
