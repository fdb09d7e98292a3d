//! Register save/restore synthesis.
//!
//! Both forms are full-descending push/pop; the single-register transfer
//! exists only for code density. Restores that include lr can load the
//! return address straight into pc, fusing the restore with the function
//! return.

use crate::arm::{Cond, IndexMode, Instruction, MemWidth, Reg, RegSet};

use super::emitter::Emitter;

/// Push `regs` onto the stack: one `str` with pre-decrement for a single
/// register, one `stmfd` for two or more. Empty sets emit nothing.
pub fn emit_save(e: &mut Emitter, cond: Cond, regs: RegSet) {
    match regs.len() {
        0 => {}
        1 => {
            let reg = regs.lowest().expect("non-empty set has a lowest register");
            e.emit(Instruction::Str {
                cond,
                src: reg,
                base: Reg::Sp,
                offset: -(Instruction::BYTES as i32),
                index: IndexMode::PreWriteback,
            });
        }
        _ => e.emit(Instruction::Stmfd {
            cond,
            base: Reg::Sp,
            writeback: true,
            regs,
        }),
    }
}

/// Pop `regs` from the stack; exact inverse of [`emit_save`]'s stack effect.
pub fn emit_restore(e: &mut Emitter, cond: Cond, regs: RegSet) {
    match regs.len() {
        0 => {}
        1 => {
            let reg = regs.lowest().expect("non-empty set has a lowest register");
            e.emit(Instruction::Ldr {
                cond,
                width: MemWidth::Word,
                dst: reg,
                base: Reg::Sp,
                offset: Instruction::BYTES as i32,
                index: IndexMode::PostIndex,
            });
        }
        _ => e.emit(Instruction::Ldmfd {
            cond,
            base: Reg::Sp,
            writeback: true,
            regs,
        }),
    }
}

/// Pop `regs` and return.
///
/// When lr is in the set its slot is loaded into pc instead, so the restore
/// doubles as the return; otherwise the set is restored normally and control
/// leaves through `bx lr`.
pub fn emit_restore_and_return(e: &mut Emitter, cond: Cond, regs: RegSet) {
    if regs.contains(Reg::Lr) {
        let mut fused = regs;
        fused.remove(Reg::Lr);
        fused.insert(Reg::Pc);
        emit_restore(e, cond, fused);
    } else {
        emit_restore(e, cond, regs);
        e.emit(Instruction::Bx {
            cond,
            reg: Reg::Lr,
        });
    }
}
