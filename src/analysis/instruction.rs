// Wed Oct 14 2026 - Alex

use crate::memory::Address;
use iced_x86::{FlowControl, Formatter, Instruction, IntelFormatter, OpKind, Register};
use std::fmt;

/// Absolute address an instruction refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand {
    pub address: Address,
    /// The address is a branch or call target rather than data.
    pub will_execute: bool,
}

impl MemoryOperand {
    /// Branches and direct calls yield their target; otherwise the first absolute or
    /// RIP-relative memory operand yields its effective address.
    pub fn of(instr: &Instruction) -> Option<Self> {
        if matches!(
            instr.flow_control(),
            FlowControl::UnconditionalBranch | FlowControl::ConditionalBranch | FlowControl::Call
        ) {
            return Some(Self {
                address: Address::new(instr.near_branch_target()),
                will_execute: true,
            });
        }

        (0..instr.op_count())
            .find(|&i| {
                instr.op_kind(i) == OpKind::Memory && matches!(instr.memory_base(), Register::None | Register::RIP)
            })
            .map(|_| Self {
                address: Address::new(instr.memory_displacement64()),
                will_execute: false,
            })
    }
}

/// Link from a branch to another instruction of the same function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalJump {
    pub target: usize,
    /// Arrow column in a disassembly view, assigned after all jumps are known.
    pub display_column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInstruction {
    pub instruction: Instruction,
    pub operand: Option<MemoryOperand>,
    pub annotation: Option<String>,
    pub local_jump: Option<LocalJump>,
}

impl FunctionInstruction {
    pub fn new(instruction: Instruction) -> Self {
        Self {
            operand: MemoryOperand::of(&instruction),
            instruction,
            annotation: None,
            local_jump: None,
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.instruction.ip())
    }

    pub fn len(&self) -> usize {
        self.instruction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruction.len() == 0
    }

    pub fn text(&self) -> String {
        let mut formatter = IntelFormatter::new();
        let mut output = String::new();
        formatter.format(&self.instruction, &mut output);
        output
    }
}

impl fmt::Display for FunctionInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X} {}", self.address(), self.text())?;
        if let Some(annotation) = &self.annotation {
            write!(f, " ; {}", annotation)?;
        }
        Ok(())
    }
}
