//! Call-site lowering.
//!
//! Arguments keep their left-to-right evaluation order but the overflow
//! portion (fifth argument onward) is placed right-to-left, so the fifth
//! argument ends up closest to the stack pointer. Besides the four argument
//! registers, the sequence clobbers only ip, lr and sp.

use crate::abi::{self, BL_RANGE, MAX_REG_ARGS, PC_READ_BIAS, SCRATCH, WORD_BYTES};
use crate::arm::{Cond, IndexMode, Instruction, MemWidth, Reg};
use crate::error::Result;
use crate::symtab::SymbolTable;

use super::address::{self, Scope};
use super::emitter::Emitter;
use super::operand::{AddressExpr, Argument};
use super::proc::ProcedureLowering;

/// The most recently materialized immediate and the register holding it,
/// tracked across one whole call lowering. A matching immediate reuses the
/// register instead of reloading; any non-immediate write to the register
/// drops the entry.
#[derive(Debug, Default)]
struct ImmCache {
    held: Option<(u32, Reg)>,
}

impl ImmCache {
    fn holding(&self, value: u32) -> Option<Reg> {
        self.held.and_then(|(v, r)| (v == value).then_some(r))
    }

    fn set(&mut self, value: u32, reg: Reg) {
        self.held = Some((value, reg));
    }

    fn invalidate(&mut self, reg: Reg) {
        if let Some((_, held_reg)) = self.held
            && held_reg == reg
        {
            self.held = None;
        }
    }
}

/// Argument after the string-literal pre-pass: every variant now resolves
/// without emitting data.
enum Lowered<'a> {
    Imm(u32),
    Mem { expr: &'a AddressExpr, width: MemWidth },
    Addr(&'a AddressExpr),
    KnownAddr(u32),
    InReg(Reg),
}

/// Bring one argument's value into `dst`.
fn load_into(
    e: &mut Emitter,
    scope: &Scope<'_>,
    cache: &mut ImmCache,
    dst: Reg,
    arg: &Lowered<'_>,
) -> Result<()> {
    match arg {
        Lowered::Imm(value) | Lowered::KnownAddr(value) => {
            if let Some(src) = cache.holding(*value) {
                if src != dst {
                    e.emit(Instruction::MovReg {
                        cond: Cond::Al,
                        dst,
                        src,
                    });
                }
            } else {
                e.emit(Instruction::LoadImm {
                    cond: Cond::Al,
                    dst,
                    value: *value,
                });
                // Only the scratch register is tracked; argument registers
                // are loaded directly and left alone.
                if dst == SCRATCH {
                    cache.set(*value, dst);
                }
            }
        }
        Lowered::InReg(src) => {
            if *src != dst {
                e.emit(Instruction::MovReg {
                    cond: Cond::Al,
                    dst,
                    src: *src,
                });
            }
            cache.invalidate(dst);
        }
        Lowered::Mem { expr, width } => {
            address::emit_load(e, Cond::Al, *width, dst, expr, scope)?;
            cache.invalidate(dst);
        }
        Lowered::Addr(expr) => {
            address::resolve_address(e, Cond::Al, dst, expr, scope)?;
            cache.invalidate(dst);
        }
    }
    Ok(())
}

fn bl_reachable(from: u32, target: u32) -> bool {
    let disp = i64::from(target) - (i64::from(from) + i64::from(PC_READ_BIAS));
    disp % i64::from(Instruction::BYTES) == 0 && disp >= -BL_RANGE && disp < BL_RANGE
}

/// Lower a complete call: argument marshaling, the call itself, and the
/// caller-side stack restore.
pub fn lower_call(
    e: &mut Emitter,
    symbols: &SymbolTable,
    mut procedure: Option<&mut ProcedureLowering>,
    target: &str,
    args: &[Argument],
) -> Result<()> {
    e.require_arm()?;

    // Step 1: materialize string literals as read-only data adjacent to the
    // call site (jumped over, so the stream stays executable) and rewrite
    // each to an address-of its block.
    let lowered: Vec<Lowered<'_>> = args
        .iter()
        .map(|arg| match arg {
            Argument::Immediate(imm) => Lowered::Imm(imm.value),
            Argument::MemoryRef { expr, width } => Lowered::Mem {
                expr,
                width: *width,
            },
            Argument::AddressOf { expr } => Lowered::Addr(expr),
            Argument::RegisterValue { reg } => Lowered::InReg(*reg),
            Argument::StringLiteral { bytes, .. } => {
                let padded = (bytes.len() as u32).next_multiple_of(Instruction::BYTES);
                e.emit(Instruction::B {
                    cond: Cond::Al,
                    target: e.here() + Instruction::BYTES + padded,
                });
                Lowered::KnownAddr(e.emit_data(bytes))
            }
        })
        .collect();

    let count = lowered.len();
    let overflow_bytes = (count.saturating_sub(MAX_REG_ARGS) as u32 * WORD_BYTES) as i32;

    // Step 2: one up-front reservation for the whole overflow region.
    if overflow_bytes > 0 {
        e.emit(Instruction::AddImm {
            cond: Cond::Al,
            dst: Reg::Sp,
            src: Reg::Sp,
            value: -overflow_bytes,
        });
    }

    let mut cache = ImmCache::default();

    // Step 3: overflow arguments, highest index first, each through the
    // scratch register except direct register stores.
    for index in (MAX_REG_ARGS..count).rev() {
        let slot = ((index - MAX_REG_ARGS) as u32 * WORD_BYTES) as i32;
        let arg = &lowered[index];
        let src = if let Lowered::InReg(reg) = arg {
            *reg
        } else {
            let mut scope = Scope::new(procedure.as_deref(), symbols);
            scope.sp_shift = overflow_bytes;
            load_into(e, &scope, &mut cache, SCRATCH, arg)?;
            SCRATCH
        };
        e.emit(Instruction::Str {
            cond: Cond::Al,
            src,
            base: Reg::Sp,
            offset: slot,
            index: IndexMode::Offset,
        });
    }

    // Step 4: the register arguments, highest index first, with the same
    // immediate tracking carried over from step 3.
    for index in (0..count.min(MAX_REG_ARGS)).rev() {
        let dst = abi::arg_reg(index);
        let mut scope = Scope::new(procedure.as_deref(), symbols);
        scope.sp_shift = overflow_bytes;
        load_into(e, &scope, &mut cache, dst, &lowered[index])?;
    }

    // Step 5: the call. Position-relative short form when the target is
    // already placed and in reach, otherwise the safe indirect form (with a
    // fixup when the address is not yet known).
    match symbols.address_of(target) {
        Some(address) if bl_reachable(e.here(), address) => {
            e.emit(Instruction::Bl {
                cond: Cond::Al,
                target: address,
            });
        }
        Some(address) => {
            e.emit(Instruction::LoadImm {
                cond: Cond::Al,
                dst: SCRATCH,
                value: address,
            });
            e.emit(Instruction::Blx {
                cond: Cond::Al,
                reg: SCRATCH,
            });
        }
        None => {
            e.emit_load_fixup(Cond::Al, SCRATCH, target);
            e.emit(Instruction::Blx {
                cond: Cond::Al,
                reg: SCRATCH,
            });
        }
    }

    // Step 6: the caller restores the stack.
    if overflow_bytes > 0 {
        e.emit(Instruction::AddImm {
            cond: Cond::Al,
            dst: Reg::Sp,
            src: Reg::Sp,
            value: overflow_bytes,
        });
    }

    if let Some(p) = procedure.as_deref_mut() {
        p.note_call_lowered();
    }
    tracing::debug!(callee = target, args = count, "call lowered");
    Ok(())
}
