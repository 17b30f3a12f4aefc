// Wed Oct 14 2026 - Alex

pub mod decoder;
pub mod function;
pub mod heuristics;
pub mod instruction;
pub mod jumps;

pub use decoder::FunctionInstructions;
pub use function::{FunctionAnalyzer, FunctionBody};
pub use heuristics::{immediate_op1, DeallocRoutines, MemoryHeuristics, SizeAndDisplacement};
pub use instruction::{FunctionInstruction, LocalJump, MemoryOperand};
pub use jumps::{allocate_columns, assign_display_columns, connect_jumps, half_row_interval};
