// Thu Oct 15 2026 - Alex

use crate::database::{ClassEntry, DatasetAddress, InstanceEntry, NameDatabase, VirtualTableEntry};
use crate::memory::{Address, Protection, RegionKind, SnapshotMemory};
use crate::symbol::SymbolTable;

pub const IMAGE_BASE: u64 = 0x1_4000_0000;
pub const CODE_BASE: u64 = 0x1_4000_1000;
pub const RDATA_BASE: u64 = 0x1_4000_2000;
pub const DATA_BASE: u64 = 0x1_4000_3000;
pub const HEAP_BASE: u64 = 0x2000_0000;
pub const DEALLOC_ROUTINE: u64 = CODE_BASE + 0xf00;
pub const MODULE_NAME: &str = "game.exe";

/// Hand-encoded x86-64, enough to build destructors, thunks and small bodies.
pub struct CodeBuilder {
    base: u64,
    bytes: Vec<u8>,
}

impl CodeBuilder {
    pub fn new(base: u64) -> Self {
        Self { base, bytes: Vec::new() }
    }

    pub fn here(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn rel32(mut self, opcode: u8, target: u64) -> Self {
        let rel = target as i64 - (self.here() + 5) as i64;
        self.bytes.push(opcode);
        self.bytes.extend_from_slice(&(rel as i32).to_le_bytes());
        self
    }

    fn imm32(mut self, opcode: u8, imm: u32) -> Self {
        self.bytes.push(opcode);
        self.bytes.extend_from_slice(&imm.to_le_bytes());
        self
    }

    pub fn mov_eax(self, imm: u32) -> Self {
        self.imm32(0xb8, imm)
    }

    pub fn mov_ecx(self, imm: u32) -> Self {
        self.imm32(0xb9, imm)
    }

    pub fn mov_edx(self, imm: u32) -> Self {
        self.imm32(0xba, imm)
    }

    /// mov rcx, rbx
    pub fn mov_rcx_rbx(self) -> Self {
        self.raw(&[0x48, 0x8b, 0xcb])
    }

    pub fn sub_rcx(self, imm: u8) -> Self {
        self.raw(&[0x48, 0x83, 0xe9, imm])
    }

    pub fn call(self, target: u64) -> Self {
        self.rel32(0xe8, target)
    }

    pub fn jmp(self, target: u64) -> Self {
        self.rel32(0xe9, target)
    }

    pub fn nop(self) -> Self {
        self.raw(&[0x90])
    }

    pub fn ret(self) -> Self {
        self.raw(&[0xc3])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes the code at its base address and returns that address.
    pub fn write(self, memory: &mut SnapshotMemory) -> Address {
        let base = Address::new(self.base);
        memory.patch(base, &self.bytes);
        base
    }
}

/// One executable image page, one read-only data page, one writable data page and a heap page.
/// The code page is filled with `int3` except for a `ret` at [`DEALLOC_ROUTINE`].
pub fn fake_memory() -> SnapshotMemory {
    let mut memory = SnapshotMemory::new(0x1000);
    memory.add_region(
        Address::new(CODE_BASE),
        &[0xcc; 0x1000],
        Protection::ReadExecute,
        RegionKind::Image,
        MODULE_NAME,
    );
    memory.patch(Address::new(DEALLOC_ROUTINE), &[0xc3]);
    memory.add_zeroed(Address::new(RDATA_BASE), 0x1000, Protection::Read, RegionKind::Image, MODULE_NAME);
    memory.add_zeroed(Address::new(DATA_BASE), 0x1000, Protection::ReadWrite, RegionKind::Image, MODULE_NAME);
    memory.add_zeroed(Address::new(HEAP_BASE), 0x1000, Protection::ReadWrite, RegionKind::Private, "");
    memory
}

pub fn fake_symbols() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    symbols.add_module(MODULE_NAME, Address::new(IMAGE_BASE), 0x4000);
    symbols
}

pub fn class_entry(vtable: u64, base: Option<&str>) -> ClassEntry {
    ClassEntry {
        vtbls: vec![VirtualTableEntry {
            ea: DatasetAddress(vtable),
            base: base.map(str::to_string),
        }],
        ..ClassEntry::default()
    }
}

pub fn instance(ea: u64, name: Option<&str>, pointer: bool) -> InstanceEntry {
    InstanceEntry {
        ea: DatasetAddress(ea),
        name: name.map(str::to_string),
        pointer,
    }
}

pub fn empty_database() -> NameDatabase {
    NameDatabase::default()
}
