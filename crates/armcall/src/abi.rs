//! Calling-convention constants (register roles, frame geometry).
//!
//! This module centralizes the fixed register assignments so that procedure
//! lowering, call-site lowering and tests all agree on them.

use crate::arm::Reg;

// ── Register Assignments ──

/// Number of arguments passed in registers; the rest go on the stack.
pub const MAX_REG_ARGS: usize = 4;

/// Primary scratch register (ip, r12).
/// The only register call-site lowering may corrupt besides the argument
/// registers, lr and sp.
pub const SCRATCH: Reg = Reg::Ip;

/// Secondary corruptible register (r11); doubles as the default frame base.
/// A procedure that addresses its frame through it includes it in its save
/// set.
pub const FRAME_BASE_DEFAULT: Reg = Reg::Fp;

/// First and last of the general registers the callee preserves (r4-r10).
pub const CALLEE_SAVED_FIRST: Reg = Reg::R4;
pub const CALLEE_SAVED_LAST: Reg = Reg::R10;

/// Inbound argument register for parameter `index` (0-3).
///
/// # Panics
///
/// Panics if `index >= MAX_REG_ARGS`.
#[must_use]
pub fn arg_reg(index: usize) -> Reg {
    assert!(index < MAX_REG_ARGS, "argument register index out of range");
    Reg::from_number(index as u8).expect("index 0-3 is a valid register number")
}

// ── Address Arithmetic ──

/// Stack slot width; every argument resolves to one register-sized value.
pub const WORD_BYTES: u32 = 4;

/// In ARM state `pc` reads as the current instruction's address plus 8.
pub const PC_READ_BIAS: u32 = 8;

/// Reach of the position-relative `bl` form: a signed 24-bit word offset.
pub const BL_RANGE: i64 = 32 * 1024 * 1024;
