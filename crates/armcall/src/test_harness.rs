//! Test harness for armcall unit tests.
//!
//! Utilities for asserting on lowered instruction sequences: rendering,
//! stack-effect interpretation and pattern counting. Only available when
//! running tests or with the `test-harness` feature enabled.

#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

use crate::arm::{IndexMode, Instruction, Reg};
use crate::lower::{Emitter, Item};

/// Clone the emitted instruction stream (data blocks skipped).
pub fn instructions(e: &Emitter) -> Vec<Instruction> {
    e.instructions().cloned().collect()
}

/// Render each instruction to its assembly text.
pub fn rendered(e: &Emitter) -> Vec<String> {
    e.instructions().map(ToString::to_string).collect()
}

/// Net stack-pointer displacement of a sequence, in bytes, by interpreting
/// every sp-writing instruction. Returns `None` when the sequence moves sp
/// in a way that cannot be tracked linearly (a register move into sp).
pub fn sp_delta(instrs: &[Instruction]) -> Option<i64> {
    let mut delta = 0i64;
    for instr in instrs {
        match instr {
            Instruction::AddImm {
                dst: Reg::Sp,
                src: Reg::Sp,
                value,
                ..
            } => delta += i64::from(*value),
            Instruction::Str {
                base: Reg::Sp,
                offset,
                index: IndexMode::PreWriteback | IndexMode::PostIndex,
                ..
            }
            | Instruction::Ldr {
                base: Reg::Sp,
                offset,
                index: IndexMode::PreWriteback | IndexMode::PostIndex,
                ..
            } => delta += i64::from(*offset),
            Instruction::Stmfd {
                base: Reg::Sp,
                writeback: true,
                regs,
                ..
            } => delta -= 4 * regs.len() as i64,
            Instruction::Ldmfd {
                base: Reg::Sp,
                writeback: true,
                regs,
                ..
            } => delta += 4 * regs.len() as i64,
            Instruction::MovReg { dst: Reg::Sp, .. } => return None,
            Instruction::AddImm { dst: Reg::Sp, .. } => return None,
            _ => {}
        }
    }
    Some(delta)
}

/// Explicit sp arithmetic instructions (`add/sub sp, sp, #n`) in order.
pub fn sp_adjustments(instrs: &[Instruction]) -> Vec<i32> {
    instrs
        .iter()
        .filter_map(|i| match i {
            Instruction::AddImm {
                dst: Reg::Sp,
                src: Reg::Sp,
                value,
                ..
            } => Some(*value),
            _ => None,
        })
        .collect()
}

/// Number of constant loads of `value` anywhere in the sequence.
pub fn count_imm_loads(instrs: &[Instruction], value: u32) -> usize {
    instrs
        .iter()
        .filter(|i| matches!(i, Instruction::LoadImm { value: v, .. } if *v == value))
        .count()
}

/// Number of block-transfer instructions in the sequence.
pub fn count_block_transfers(instrs: &[Instruction]) -> usize {
    instrs
        .iter()
        .filter(|i| matches!(i, Instruction::Stmfd { .. } | Instruction::Ldmfd { .. }))
        .count()
}

/// Addresses and payloads of the emitted data blocks.
pub fn data_blocks(e: &Emitter) -> Vec<(u32, Vec<u8>)> {
    let mut out = Vec::new();
    let mut address = e.origin();
    for item in e.items() {
        if let Item::Data(bytes) = item {
            out.push((address, bytes.clone()));
        }
        address += item.byte_len();
    }
    out
}
