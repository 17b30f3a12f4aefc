// Thu Oct 15 2026 - Alex

use crate::memory::process::{parse_maps, MapsEntry};
use crate::memory::Address;
use crate::symbol::{ModuleAddress, ModuleInfo, ModuleSymbolResolver, SymbolError, SymbolTable};
use goblin::elf::{program_header, sym, Elf};
use indexmap::IndexMap;
use libc::pid_t;
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Resolves addresses against the modules mapped into a live process and their ELF symbols.
///
/// The module list is rebuilt lazily once it is older than `max_age`.
pub struct ProcessModuleResolver {
    pid: pid_t,
    max_age: Duration,
    cached: Mutex<Option<(Instant, Arc<SymbolTable>)>>,
}

impl ProcessModuleResolver {
    pub fn new(pid: pid_t, max_age: Duration) -> Self {
        Self {
            pid,
            max_age,
            cached: Mutex::new(None),
        }
    }

    pub fn table(&self) -> Arc<SymbolTable> {
        if let Some((built, table)) = self.cached.lock().as_ref() {
            if built.elapsed() < self.max_age {
                return table.clone();
            }
        }

        let table = match self.build_table() {
            Ok(table) => Arc::new(table),
            Err(e) => {
                log::warn!("failed to enumerate modules of process {}: {}", self.pid, e);
                Arc::new(SymbolTable::new())
            }
        };
        *self.cached.lock() = Some((Instant::now(), table.clone()));
        table
    }

    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    fn build_table(&self) -> Result<SymbolTable, SymbolError> {
        let maps = parse_maps(&fs::read_to_string(format!("/proc/{}/maps", self.pid))?);
        let exe = fs::read_link(format!("/proc/{}/exe", self.pid)).ok();

        let mut files: IndexMap<String, Vec<MapsEntry>> = IndexMap::new();
        for entry in maps.into_iter().filter(|e| e.path.starts_with('/')) {
            files.entry(entry.path.clone()).or_default().push(entry);
        }

        let mut table = SymbolTable::new();
        for (path, entries) in &files {
            let base = entries.iter().map(|e| e.start).min().unwrap_or_default();
            let end = entries.iter().map(|e| e.end).max().unwrap_or_default();
            let name = module_name(path);
            table.add_module(&name, Address::new(base), end - base);

            if exe.as_deref() == Some(Path::new(path)) {
                table.set_main_module(&name);
            }

            let has_code = entries.iter().any(|e| e.protection.can_execute());
            if has_code {
                match load_elf_symbols(&mut table, Path::new(path), base) {
                    Ok(count) => log::trace!("{}: {} symbols", name, count),
                    Err(e) => log::debug!("no symbols for {}: {}", name, e),
                }
            }
        }

        log::debug!(
            "module table of process {} refreshed: {} modules, {} symbols",
            self.pid,
            table.module_count(),
            table.symbol_count()
        );
        Ok(table)
    }
}

fn module_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

fn load_elf_symbols(table: &mut SymbolTable, path: &Path, base: u64) -> Result<usize, SymbolError> {
    let data = fs::read(path)?;
    let elf = Elf::parse(&data).map_err(|e| SymbolError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let first_load = elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == program_header::PT_LOAD)
        .map(|ph| ph.p_vaddr & !0xfff)
        .min()
        .unwrap_or_default();
    let bias = base.wrapping_sub(first_load);

    let mut count = 0;
    let symbols = elf
        .syms
        .iter()
        .map(|s| (s, &elf.strtab))
        .chain(elf.dynsyms.iter().map(|s| (s, &elf.dynstrtab)));
    for (symbol, strtab) in symbols {
        let kind = symbol.st_type();
        if symbol.st_value == 0 || (kind != sym::STT_FUNC && kind != sym::STT_OBJECT) {
            continue;
        }
        let Some(name) = strtab.get_at(symbol.st_name).filter(|n| !n.is_empty()) else {
            continue;
        };
        table.add_symbol(name, Address::new(bias.wrapping_add(symbol.st_value)), symbol.st_size);
        count += 1;
    }
    Ok(count)
}

impl ModuleSymbolResolver for ProcessModuleResolver {
    fn resolve(&self, addr: Address) -> Option<ModuleAddress> {
        self.table().resolve(addr)
    }

    fn module_at(&self, addr: Address) -> Option<ModuleInfo> {
        self.table().module_at(addr)
    }

    fn main_module(&self) -> Option<ModuleInfo> {
        self.table().main_module()
    }
}
