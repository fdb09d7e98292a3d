#![allow(
    clippy::cast_possible_truncation, // intentional: byte offsets move between u32 and i32
    clippy::cast_possible_wrap, // intentional: frame offsets are signed, addresses are not
    clippy::cast_sign_loss, // intentional: displacements are materialized as raw 32-bit patterns
    clippy::missing_errors_doc // every fallible operation returns the crate-level Error
)]

pub mod abi;
pub mod arm;
pub mod error;
pub mod lower;
pub mod symtab;

/// Assertion helpers for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use arm::{Cond, IndexMode, Instruction, MemWidth, Reg, RegSet};
pub use error::{Error, Result};
pub use lower::{
    AddressExpr, Argument, Emitter, FrameBase, IsaMode, Item, ProcedureDecl, ProcedureLowering,
    SpillPolicy, lower_call,
};
pub use symtab::{ProcedureInfo, SymbolTable};
