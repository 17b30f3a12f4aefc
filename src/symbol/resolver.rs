// Wed Oct 14 2026 - Alex

use crate::memory::{Address, MemoryRange};
use crate::symbol::ModuleAddress;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub range: MemoryRange,
}

impl ModuleInfo {
    pub fn new(name: &str, base: Address, size: u64) -> Self {
        Self {
            name: name.to_string(),
            range: MemoryRange::from_start_size(base, size),
        }
    }

    pub fn base(&self) -> Address {
        self.range.start()
    }
}

/// Maps code addresses to `module!symbol+displacement`.
pub trait ModuleSymbolResolver: Send + Sync {
    fn resolve(&self, addr: Address) -> Option<ModuleAddress>;

    fn module_at(&self, addr: Address) -> Option<ModuleInfo>;

    /// The main executable image, whose code holds the deallocation routines.
    fn main_module(&self) -> Option<ModuleInfo>;

    fn module_name(&self, addr: Address) -> Option<String> {
        self.module_at(addr).map(|m| m.name)
    }
}

#[derive(Debug, Clone)]
struct SymbolEntry {
    name: String,
    size: u64,
}

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    modules: BTreeMap<u64, ModuleInfo>,
    symbols: BTreeMap<u64, SymbolEntry>,
    main_module: Option<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first module added becomes the main module unless one is set explicitly.
    pub fn add_module(&mut self, name: &str, base: Address, size: u64) {
        if self.main_module.is_none() {
            self.main_module = Some(name.to_string());
        }
        self.modules.insert(base.as_u64(), ModuleInfo::new(name, base, size));
    }

    pub fn set_main_module(&mut self, name: &str) {
        self.main_module = Some(name.to_string());
    }

    /// A `size` of 0 means the symbol extends up to the next symbol.
    pub fn add_symbol(&mut self, name: &str, addr: Address, size: u64) {
        self.symbols.insert(
            addr.as_u64(),
            SymbolEntry {
                name: name.to_string(),
                size,
            },
        );
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.values()
    }

    pub fn find_module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.values().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    fn module_containing(&self, addr: Address) -> Option<&ModuleInfo> {
        self.modules
            .range(..=addr.as_u64())
            .next_back()
            .map(|(_, m)| m)
            .filter(|m| m.range.contains(addr))
    }
}

impl ModuleSymbolResolver for SymbolTable {
    fn resolve(&self, addr: Address) -> Option<ModuleAddress> {
        let module = self.module_containing(addr)?;

        let symbol = self
            .symbols
            .range(module.base().as_u64()..=addr.as_u64())
            .next_back()
            .filter(|(&start, entry)| entry.size == 0 || addr.as_u64() < start + entry.size);

        Some(match symbol {
            Some((&start, entry)) => ModuleAddress::new(&module.name, Some(&entry.name), addr.as_u64() - start, addr),
            None => ModuleAddress::new(&module.name, None, addr.as_u64() - module.base().as_u64(), addr),
        })
    }

    fn module_at(&self, addr: Address) -> Option<ModuleInfo> {
        self.module_containing(addr).cloned()
    }

    fn main_module(&self) -> Option<ModuleInfo> {
        let name = self.main_module.as_deref()?;
        self.find_module(name).cloned()
    }
}
