// Wed Oct 14 2026 - Alex

use crate::analysis::FunctionInstructions;
use crate::memory::{Address, CodeReader, MemoryAccessor, MemoryRegion};
use crate::pattern::{Pattern, PatternScanner};
use crate::symbol::ModuleSymbolResolver;
use iced_x86::{Decoder, DecoderOptions, FlowControl, Instruction, Mnemonic, OpKind, Register};
use std::sync::Arc;

/// Bytes decoded when checking for a `sub rcx, imm; jmp target` thunk.
const THUNK_WINDOW: usize = 16;

/// Addresses of the routines destructors call to free their object.
///
/// An empty set disables the destructor size heuristic altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeallocRoutines {
    routines: Vec<Address>,
}

impl DeallocRoutines {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        let mut routines: Vec<Address> = addresses.into_iter().collect();
        routines.sort();
        routines.dedup();
        Self { routines }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.routines.binary_search(&addr).is_ok()
    }

    pub fn addresses(&self) -> &[Address] {
        &self.routines
    }

    /// Locates each routine through a call-site signature (`E8 rel32 ...`) in the
    /// executable regions of the main module. Every signature has to match, otherwise
    /// the returned set is empty.
    pub fn resolve(
        accessor: &dyn MemoryAccessor,
        resolver: &dyn ModuleSymbolResolver,
        signatures: &[String],
    ) -> Self {
        let Some(main) = resolver.main_module() else {
            log::warn!("no main module, destructor size heuristic disabled");
            return Self::disabled();
        };

        let regions: Vec<MemoryRegion> = accessor
            .regions()
            .into_iter()
            .filter(|r| r.is_executable() && main.range.contains(r.start()))
            .collect();

        let scanner = PatternScanner::new();
        let mut routines = Vec::with_capacity(signatures.len());
        for signature in signatures {
            let pattern = match Pattern::from_ida_pattern(signature) {
                Ok(pattern) => pattern,
                Err(e) => {
                    log::warn!("bad dealloc signature '{}': {}", signature, e);
                    return Self::disabled();
                }
            };

            let target = scanner
                .scan(accessor, &pattern, &regions)
                .into_iter()
                .find_map(|site| call_target(accessor, site));
            match target {
                Some(target) => routines.push(target),
                None => {
                    log::warn!("dealloc signature '{}' not found, destructor size heuristic disabled", signature);
                    return Self::disabled();
                }
            }
        }

        let routines = Self::new(routines);
        log::debug!("dealloc routines resolved: {:X?}", routines.addresses());
        routines
    }
}

/// Target of the `call rel32` at `site`.
fn call_target(accessor: &dyn MemoryAccessor, site: Address) -> Option<Address> {
    if accessor.read_u8(site).ok()? != 0xe8 {
        return None;
    }
    let rel = accessor.read_u32(site + 1).ok()? as i32;
    Some((site + 5).offset(rel as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAndDisplacement {
    pub size: u32,
    /// How far the `this` the destructor receives lies inside the object it frees.
    pub displacement: u32,
}

/// Immediate value of operand 1, if it is one.
pub fn immediate_op1(instr: &Instruction) -> Option<u64> {
    if instr.op_count() < 2 {
        return None;
    }
    match instr.op1_kind() {
        OpKind::Immediate8
        | OpKind::Immediate16
        | OpKind::Immediate32
        | OpKind::Immediate64
        | OpKind::Immediate8to16
        | OpKind::Immediate8to32
        | OpKind::Immediate8to64
        | OpKind::Immediate32to64 => Some(instr.immediate(1)),
        _ => None,
    }
}

fn is_sub_rcx_imm(instr: &Instruction) -> Option<u32> {
    if instr.mnemonic() == Mnemonic::Sub && instr.op0_kind() == OpKind::Register && instr.op0_register() == Register::RCX
    {
        immediate_op1(instr).map(|imm| imm as u32)
    } else {
        None
    }
}

/// `mov r32, imm` into a register a dealloc routine takes its size in.
fn is_mov_size_arg_imm(instr: &Instruction) -> Option<u32> {
    if instr.mnemonic() == Mnemonic::Mov
        && instr.op0_kind() == OpKind::Register
        && matches!(instr.op0_register(), Register::ECX | Register::EDX | Register::R8D)
    {
        immediate_op1(instr).map(|imm| imm as u32)
    } else {
        None
    }
}

/// Machine-code heuristics over destructors and virtual functions.
pub struct MemoryHeuristics {
    memory: Arc<dyn MemoryAccessor>,
    routines: DeallocRoutines,
    max_depth: u32,
}

impl MemoryHeuristics {
    pub fn new(memory: Arc<dyn MemoryAccessor>, routines: DeallocRoutines, max_depth: u32) -> Self {
        if routines.is_empty() {
            log::debug!("no dealloc routines, destructor size heuristic disabled");
        }
        Self {
            memory,
            routines,
            max_depth,
        }
    }

    pub fn routines(&self) -> &DeallocRoutines {
        &self.routines
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Size of the object a destructor frees, from the `mov edx, size` (or `ecx`/`r8d`) that precedes
    /// its call (or tail jump) to a dealloc routine.
    pub fn estimate_size(&self, dtor: Address) -> Option<u32> {
        self.estimate_size_and_displacement(dtor).map(|s| s.size)
    }

    /// Like [`estimate_size`](Self::estimate_size), but also follows a leading
    /// `sub rcx, k; jmp real_dtor` thunk and reports the accumulated `k`.
    pub fn estimate_size_and_displacement(&self, dtor: Address) -> Option<SizeAndDisplacement> {
        if self.routines.is_empty() {
            return None;
        }
        self.scan_destructor(dtor, 0)
    }

    fn scan_destructor(&self, dtor: Address, depth: u32) -> Option<SizeAndDisplacement> {
        if depth > self.max_depth {
            log::debug!("destructor scan at {} cut off at depth {}", dtor, depth);
            return None;
        }
        if !self.memory.can_execute(dtor) {
            return None;
        }

        let page_size = self.memory.page_size() as usize;
        let code = CodeReader::new(self.memory.as_ref(), page_size).read(dtor);
        let mut size = None;
        let mut displacement = 0u32;

        for (index, instr) in FunctionInstructions::new(&code, dtor.as_u64()).enumerate() {
            if let Some(imm) = is_mov_size_arg_imm(&instr) {
                size = Some(imm);
                continue;
            }

            if let Some(callee) = self.callee(&instr) {
                if self.routines.contains(callee) {
                    return size.map(|size| SizeAndDisplacement { size, displacement });
                }
            }

            if index == 0 {
                if let Some(k) = is_sub_rcx_imm(&instr) {
                    displacement = k;
                }
            } else if index == 1 && displacement != 0 && instr.flow_control() == FlowControl::UnconditionalBranch {
                let target = Address::new(instr.near_branch_target());
                return self.scan_destructor(target, depth + 1).map(|mut found| {
                    found.displacement += displacement;
                    found
                });
            }
        }

        None
    }

    /// Destination of a call or jump, reading the slot for `[rip+disp]` forms.
    fn callee(&self, instr: &Instruction) -> Option<Address> {
        match instr.flow_control() {
            FlowControl::Call | FlowControl::UnconditionalBranch => Some(Address::new(instr.near_branch_target())),
            FlowControl::IndirectCall | FlowControl::IndirectBranch
                if instr.op0_kind() == OpKind::Memory && instr.memory_base() == Register::RIP =>
            {
                self.memory.read_ptr(Address::new(instr.memory_displacement64())).ok()
            }
            _ => None,
        }
    }

    /// `(k, target)` when `addr` starts with `sub rcx, k; jmp target`.
    pub fn thunk_at(&self, addr: Address) -> Option<(u32, Address)> {
        if !self.memory.can_execute(addr) {
            return None;
        }
        let code = CodeReader::new(self.memory.as_ref(), THUNK_WINDOW).read(addr);
        let mut decoder = Decoder::with_ip(64, &code, addr.as_u64(), DecoderOptions::NONE);

        let first = decoder.decode();
        let k = is_sub_rcx_imm(&first).filter(|&k| k != 0)?;
        let second = decoder.decode();
        if second.is_invalid() || second.flow_control() != FlowControl::UnconditionalBranch {
            return None;
        }
        Some((k, Address::new(second.near_branch_target())))
    }

    /// Total `this` adjustment applied by a chain of thunks starting at `vfunc`.
    pub fn this_adjustment(&self, vfunc: Address) -> u32 {
        let mut total = 0u32;
        let mut current = vfunc;
        for _ in 0..self.max_depth {
            match self.thunk_at(current) {
                Some((k, target)) => {
                    total = total.wrapping_add(k);
                    current = target;
                }
                None => return total,
            }
        }
        log::debug!("thunk chain from {} cut off after {} steps", vfunc, self.max_depth);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::*;

    fn heuristics(memory: crate::memory::SnapshotMemory) -> MemoryHeuristics {
        MemoryHeuristics::new(
            Arc::new(memory),
            DeallocRoutines::new([Address::new(DEALLOC_ROUTINE)]),
            8,
        )
    }

    #[test]
    fn test_size_from_call_to_dealloc() {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE).mov_edx(0x18).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        assert_eq!(heuristics(memory).estimate_size(dtor), Some(0x18));
    }

    #[test]
    fn test_size_with_argument_shuffle_and_tail_jump() {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE)
            .mov_edx(0x40)
            .mov_rcx_rbx()
            .jmp(DEALLOC_ROUTINE)
            .write(&mut memory);
        assert_eq!(heuristics(memory).estimate_size(dtor), Some(0x40));
    }

    #[test]
    fn test_unrelated_register_does_not_replace_size() {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE)
            .mov_edx(0x40)
            .mov_eax(1)
            .call(DEALLOC_ROUTINE)
            .ret()
            .write(&mut memory);
        assert_eq!(heuristics(memory).estimate_size(dtor), Some(0x40));
    }

    #[test]
    fn test_call_elsewhere_is_ignored() {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE)
            .mov_edx(0x18)
            .call(CODE_BASE + 0x800)
            .ret()
            .write(&mut memory);
        assert_eq!(heuristics(memory).estimate_size(dtor), None);
    }

    #[test]
    fn test_disabled_without_routines() {
        let mut memory = fake_memory();
        let dtor = CodeBuilder::new(CODE_BASE).mov_edx(0x18).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        let heuristics = MemoryHeuristics::new(Arc::new(memory), DeallocRoutines::disabled(), 8);
        assert_eq!(heuristics.estimate_size(dtor), None);
    }

    #[test]
    fn test_non_executable_is_rejected() {
        let heuristics = heuristics(fake_memory());
        assert_eq!(heuristics.estimate_size(Address::new(HEAP_BASE)), None);
        assert_eq!(heuristics.estimate_size(Address::new(0x10)), None);
    }

    #[test]
    fn test_destructor_thunk_adds_displacement() {
        let mut memory = fake_memory();
        CodeBuilder::new(CODE_BASE).mov_edx(0x30).call(DEALLOC_ROUTINE).ret().write(&mut memory);
        let thunk = CodeBuilder::new(CODE_BASE + 0x100).sub_rcx(0x10).jmp(CODE_BASE).write(&mut memory);

        assert_eq!(
            heuristics(memory).estimate_size_and_displacement(thunk),
            Some(SizeAndDisplacement {
                size: 0x30,
                displacement: 0x10
            })
        );
    }

    #[test]
    fn test_self_referencing_thunk_terminates() {
        let mut memory = fake_memory();
        let thunk = CodeBuilder::new(CODE_BASE).sub_rcx(0x8).jmp(CODE_BASE).write(&mut memory);
        let heuristics = heuristics(memory);

        assert_eq!(heuristics.estimate_size_and_displacement(thunk), None);
        assert_eq!(heuristics.this_adjustment(thunk), 0x8 * 8);
    }

    #[test]
    fn test_this_adjustment_follows_chain() {
        let mut memory = fake_memory();
        CodeBuilder::new(CODE_BASE).nop().ret().write(&mut memory);
        CodeBuilder::new(CODE_BASE + 0x100).sub_rcx(0x10).jmp(CODE_BASE).write(&mut memory);
        let outer = CodeBuilder::new(CODE_BASE + 0x200).sub_rcx(0x8).jmp(CODE_BASE + 0x100).write(&mut memory);
        let heuristics = heuristics(memory);

        assert_eq!(heuristics.this_adjustment(outer), 0x18);
        assert_eq!(heuristics.this_adjustment(Address::new(CODE_BASE)), 0);
        assert_eq!(heuristics.thunk_at(outer), Some((0x8, Address::new(CODE_BASE + 0x100))));
    }

    #[test]
    fn test_resolve_from_call_site_signature() {
        let mut memory = fake_memory();
        CodeBuilder::new(CODE_BASE + 0x40)
            .call(DEALLOC_ROUTINE)
            .raw(&[0x48, 0xc7, 0x04])
            .write(&mut memory);
        let symbols = fake_symbols();

        let routines = DeallocRoutines::resolve(&memory, &symbols, &["E8 ?? ?? ?? ?? 48 C7 04".to_string()]);
        assert_eq!(routines.addresses(), &[Address::new(DEALLOC_ROUTINE)]);

        let missing = DeallocRoutines::resolve(
            &memory,
            &symbols,
            &["E8 ?? ?? ?? ?? 48 C7 04".to_string(), "E8 ?? ?? ?? ?? 48 8B C3 48 83 C4 ?? 5F 5D".to_string()],
        );
        assert!(missing.is_empty());
    }
}
