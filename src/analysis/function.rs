// Wed Oct 14 2026 - Alex

use crate::analysis::{assign_display_columns, connect_jumps, FunctionInstruction, FunctionInstructions};
use crate::identify::{AddressIdentifier, AddressType};
use crate::memory::{Address, CodeReader, MemoryAccessor};
use std::sync::Arc;

/// A decoded function: its instructions with jump links, arrow columns and annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    pub address: Address,
    pub instructions: Vec<FunctionInstruction>,
    /// Bytes from the entry to the end of the last decoded instruction.
    pub size: u64,
    /// Number of arrow columns the local jumps need.
    pub jump_columns: usize,
}

impl FunctionBody {
    pub fn end(&self) -> Address {
        self.address + self.size
    }

    pub fn local_jump_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.local_jump.is_some()).count()
    }
}

pub struct FunctionAnalyzer {
    memory: Arc<dyn MemoryAccessor>,
    identifier: Arc<AddressIdentifier>,
    max_bytes: usize,
}

impl FunctionAnalyzer {
    pub fn new(memory: Arc<dyn MemoryAccessor>, identifier: Arc<AddressIdentifier>, max_bytes: usize) -> Self {
        Self {
            memory,
            identifier,
            max_bytes,
        }
    }

    /// Decodes the function at `addr`. Unreadable or undecodable code gives a body
    /// that stops at the last good instruction, possibly empty.
    pub fn analyze(&self, addr: Address) -> FunctionBody {
        let code = CodeReader::new(self.memory.as_ref(), self.max_bytes).read(addr);
        let mut decoded = FunctionInstructions::new(&code, addr.as_u64());
        let mut instructions: Vec<FunctionInstruction> = decoded.by_ref().map(FunctionInstruction::new).collect();
        let size = decoded.end_ip() - addr.as_u64();

        connect_jumps(&mut instructions);
        let jump_columns = assign_display_columns(&mut instructions);
        self.annotate(&mut instructions);

        log::trace!(
            "analyzed function at {}: {} instructions, {} bytes",
            addr,
            instructions.len(),
            size
        );

        FunctionBody {
            address: addr,
            instructions,
            size,
            jump_columns,
        }
    }

    fn annotate(&self, instructions: &mut [FunctionInstruction]) {
        for instr in instructions.iter_mut().filter(|i| i.local_jump.is_none()) {
            let Some(operand) = instr.operand else {
                continue;
            };
            let hint = if operand.will_execute {
                AddressType::FUNCTION
            } else {
                AddressType::ALL
            };
            instr.annotation = self.identifier.identify(operand.address, hint).full_name();
        }
    }
}
