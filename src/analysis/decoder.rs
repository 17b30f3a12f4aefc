// Wed Oct 14 2026 - Alex

use iced_x86::{Decoder, DecoderOptions, FlowControl, Instruction};
use std::collections::HashSet;

/// Decodes one function body, stopping at the first terminator (unconditional jump,
/// indirect jump or return) that is not followed by a target of an earlier branch.
///
/// Undecodable bytes end the stream without an error.
pub struct FunctionInstructions<'a> {
    decoder: Decoder<'a>,
    branch_targets: HashSet<u64>,
    end: u64,
    done: bool,
}

impl<'a> FunctionInstructions<'a> {
    pub fn new(code: &'a [u8], ip: u64) -> Self {
        Self {
            decoder: Decoder::with_ip(64, code, ip, DecoderOptions::NONE),
            branch_targets: HashSet::new(),
            end: ip,
            done: false,
        }
    }

    /// Address right after the last instruction yielded so far.
    pub fn end_ip(&self) -> u64 {
        self.end
    }
}

impl Iterator for FunctionInstructions<'_> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        if self.done || !self.decoder.can_decode() {
            self.done = true;
            return None;
        }

        let instr = self.decoder.decode();
        if instr.is_invalid() {
            log::trace!("decoding stopped at 0x{:x}: invalid instruction", instr.ip());
            self.done = true;
            return None;
        }
        self.end = instr.next_ip();

        match instr.flow_control() {
            FlowControl::UnconditionalBranch | FlowControl::ConditionalBranch => {
                self.branch_targets.insert(instr.near_branch_target());
            }
            _ => {}
        }

        if matches!(
            instr.flow_control(),
            FlowControl::UnconditionalBranch | FlowControl::IndirectBranch | FlowControl::Return
        ) && !self.branch_targets.contains(&instr.next_ip())
        {
            self.done = true;
        }

        Some(instr)
    }
}
