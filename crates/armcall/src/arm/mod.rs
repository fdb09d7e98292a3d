mod cond;
mod instruction;
mod reg;
mod regset;

pub use cond::Cond;
pub use instruction::{IndexMode, Instruction, MemWidth};
pub use reg::Reg;
pub use regset::RegSet;
