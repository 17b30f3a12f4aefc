// Wed Oct 14 2026 - Alex

use crate::analysis::{FunctionInstruction, LocalJump};
use ahash::AHashMap;
use itertools::Itertools;

/// Links every branch whose target is an instruction of the same body.
pub fn connect_jumps(instructions: &mut [FunctionInstruction]) {
    let by_address: AHashMap<u64, usize> = instructions
        .iter()
        .enumerate()
        .map(|(index, instr)| (instr.address().as_u64(), index))
        .collect();

    for instr in instructions.iter_mut() {
        let target = match instr.operand {
            Some(operand) if operand.will_execute => by_address.get(&operand.address.as_u64()).copied(),
            _ => None,
        };
        instr.local_jump = target.map(|target| LocalJump {
            target,
            display_column: None,
        });
    }
}

/// Half-row span covered by an arrow from row `from` to row `to`.
///
/// Row `i` owns half-rows `2i` (top) and `2i + 1` (bottom); arrows leave from the
/// bottom of their source row and enter at the top of their target row.
pub fn half_row_interval(from: usize, to: usize) -> (usize, usize) {
    let start = from * 2 + 1;
    let end = to * 2;
    (start.min(end), start.max(end))
}

/// Assigns a display column to each `(from, to)` jump so that jumps sharing a
/// column never cover a common half-row. Shorter jumps get the lower columns.
pub fn allocate_columns(rows: usize, jumps: &[(usize, usize)]) -> Vec<usize> {
    let intervals: Vec<(usize, usize)> = jumps.iter().map(|&(f, t)| half_row_interval(f, t)).collect();
    let mut pending: Vec<usize> = (0..jumps.len())
        .sorted_by_key(|&i| (intervals[i].1 - intervals[i].0, jumps[i].0))
        .collect();

    let half_rows = (rows * 2).max(intervals.iter().map(|&(_, end)| end + 1).max().unwrap_or(0));
    let mut columns = vec![0usize; jumps.len()];
    let mut column = 0;

    while !pending.is_empty() {
        let mut occupied = vec![false; half_rows];
        pending.retain(|&i| {
            let (start, end) = intervals[i];
            if occupied[start..=end].iter().any(|&o| o) {
                return true;
            }
            occupied[start..=end].iter_mut().for_each(|o| *o = true);
            columns[i] = column;
            false
        });
        column += 1;
    }

    columns
}

/// Fills `display_column` on every local jump. Returns the number of columns used.
pub fn assign_display_columns(instructions: &mut [FunctionInstruction]) -> usize {
    let sources: Vec<(usize, usize)> = instructions
        .iter()
        .enumerate()
        .filter_map(|(index, instr)| instr.local_jump.map(|jump| (index, jump.target)))
        .collect();

    let columns = allocate_columns(instructions.len(), &sources);
    for (&(from, _), &column) in sources.iter().zip(&columns) {
        if let Some(jump) = instructions[from].local_jump.as_mut() {
            jump.display_column = Some(column);
        }
    }

    columns.iter().map(|c| c + 1).max().unwrap_or(0)
}
