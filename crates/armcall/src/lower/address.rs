//! Effective-address resolution.
//!
//! A symbolic operand is either frame-relative (parameter or local of the
//! active procedure) or link-relative (external/global). The distinction is
//! purely contextual and decided at lowering time, never at run time:
//! frame-relative addresses cost one instruction off the frame base,
//! global addresses cost the two-instruction pc-relative idiom with the
//! displacement computed at emit time.

use crate::abi::PC_READ_BIAS;
use crate::arm::{Cond, IndexMode, Instruction, MemWidth, Reg};
use crate::error::{Error, Result};
use crate::symtab::SymbolTable;

use super::emitter::Emitter;
use super::frame::SlotRef;
use super::operand::AddressExpr;
use super::proc::ProcedureLowering;

/// Resolution context: the active procedure (if any) and the unit's symbols.
pub struct Scope<'a> {
    pub procedure: Option<&'a ProcedureLowering>,
    pub symbols: &'a SymbolTable,
    /// Extra displacement of sp below its steady-state position, nonzero
    /// only inside a call sequence that has reserved overflow-argument
    /// space. Sp-based frame offsets must account for it.
    pub sp_shift: i32,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub fn new(procedure: Option<&'a ProcedureLowering>, symbols: &'a SymbolTable) -> Self {
        Self {
            procedure,
            symbols,
            sp_shift: 0,
        }
    }
}

/// Where a symbolic operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Frame { base: Reg, offset: i32 },
    /// No-spill parameter aliasing an argument register.
    Register(Reg),
    Absolute(u32),
}

/// Classify an address expression against the scope. Locals and parameters
/// shadow globals of the same name.
pub fn classify(expr: &AddressExpr, scope: &Scope) -> Result<Place> {
    if let Some(procedure) = scope.procedure
        && let Some(slot) = procedure.slot(&expr.name)
    {
        let shift = if procedure.base_reg() == Reg::Sp {
            scope.sp_shift
        } else {
            0
        };
        return match slot {
            SlotRef::Frame(offset) => Ok(Place::Frame {
                base: procedure.base_reg(),
                offset: offset + expr.adjust + shift,
            }),
            SlotRef::Reg(_) if expr.adjust != 0 => {
                Err(Error::UnspilledParameterAddress(expr.name.clone()))
            }
            SlotRef::Reg(reg) => Ok(Place::Register(reg)),
        };
    }
    if let Some(address) = scope.symbols.address_of(&expr.name) {
        return Ok(Place::Absolute(address.wrapping_add(expr.adjust as u32)));
    }
    Err(Error::UnresolvableSymbol(expr.name.clone()))
}

/// Materialize a known absolute address as a pc-relative computation:
/// the displacement to the second instruction's pc read, then
/// `add dst, pc, dst`.
pub(crate) fn emit_absolute_address(e: &mut Emitter, cond: Cond, dst: Reg, address: u32) {
    let pc = e.here() + Instruction::BYTES + PC_READ_BIAS;
    e.emit(Instruction::LoadImm {
        cond,
        dst,
        value: address.wrapping_sub(pc),
    });
    e.emit(Instruction::AddPc { cond, dst });
}

/// Compute the effective address of `expr` into `dst`.
pub fn resolve_address(
    e: &mut Emitter,
    cond: Cond,
    dst: Reg,
    expr: &AddressExpr,
    scope: &Scope<'_>,
) -> Result<()> {
    match classify(expr, scope)? {
        Place::Frame { base, offset } => e.emit(Instruction::AddImm {
            cond,
            dst,
            src: base,
            value: offset,
        }),
        Place::Register(_) => {
            return Err(Error::UnspilledParameterAddress(expr.name.clone()));
        }
        Place::Absolute(address) => emit_absolute_address(e, cond, dst, address),
    }
    Ok(())
}

/// Load the value named by `expr` into `dst`, extending to 32 bits per
/// `width`. Register-aliased parameters become a plain move.
pub fn emit_load(
    e: &mut Emitter,
    cond: Cond,
    width: MemWidth,
    dst: Reg,
    expr: &AddressExpr,
    scope: &Scope<'_>,
) -> Result<()> {
    match classify(expr, scope)? {
        Place::Frame { base, offset } => e.emit(Instruction::Ldr {
            cond,
            width,
            dst,
            base,
            offset,
            index: IndexMode::Offset,
        }),
        Place::Register(src) => {
            if src != dst {
                e.emit(Instruction::MovReg { cond, dst, src });
            }
        }
        Place::Absolute(address) => {
            emit_absolute_address(e, cond, dst, address);
            e.emit(Instruction::Ldr {
                cond,
                width,
                dst,
                base: dst,
                offset: 0,
                index: IndexMode::Offset,
            });
        }
    }
    Ok(())
}
