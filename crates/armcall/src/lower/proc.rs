//! Procedure-scope lowering: prologue, epilogue and named-slot resolution.
//!
//! All per-procedure state lives in one `ProcedureLowering` value created at
//! the declaration and consumed when the scope closes, so nested or
//! reentrant procedure scopes cannot be expressed at all. Callers of the
//! procedure never see this context; they agree with it only through the
//! calling convention.

use crate::abi::{self, MAX_REG_ARGS};
use crate::arm::{Cond, Instruction, Reg, RegSet};
use crate::error::{Error, Result};
use crate::symtab::{ProcedureInfo, SymbolTable};

use super::emitter::Emitter;
use super::frame::{FrameBase, FrameLayout, SlotRef, SpillPolicy};
use super::locals::LocalArea;
use super::save_restore::{emit_restore, emit_restore_and_return, emit_save};

/// A procedure declaration: everything the prologue and the addressing
/// scheme are derived from. Fixed once the procedure opens.
#[derive(Debug, Clone)]
pub struct ProcedureDecl {
    pub name: String,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Registers the procedure declares it will preserve.
    pub saves: RegSet,
    pub spill: SpillPolicy,
    pub base: FrameBase,
}

#[derive(Debug)]
pub struct ProcedureLowering {
    name: String,
    layout: FrameLayout,
    locals: LocalArea,
    entry: u32,
    base_set: bool,
    call_lowered: bool,
}

impl ProcedureLowering {
    /// Open a procedure scope: register it in the symbol table and emit the
    /// prologue (spilled-argument push, save-set push, frame-base setup —
    /// each elided when empty).
    pub fn begin(e: &mut Emitter, symbols: &mut SymbolTable, decl: ProcedureDecl) -> Result<Self> {
        e.require_arm()?;
        for (i, p) in decl.params.iter().enumerate() {
            if decl.params[..i].iter().any(|q| q == p) {
                return Err(Error::DuplicateLocal(p.clone()));
            }
        }

        let spilled = match decl.spill {
            SpillPolicy::Spill => decl.params.len().min(MAX_REG_ARGS),
            SpillPolicy::NoSpill => 0,
        };
        let stack_args = decl.params.len().saturating_sub(MAX_REG_ARGS);

        // Frame addressing is already known to be needed when there are
        // spilled copies or caller-pushed arguments; the base register gets
        // corrupted by the setup move, so it joins the save set.
        let needs_base = (spilled > 0 || stack_args > 0) && decl.base != FrameBase::Sp;
        let mut saves = decl.saves;
        if needs_base {
            saves.insert(decl.base.reg());
        }

        let entry = e.here();
        symbols.declare_procedure(
            &decl.name,
            ProcedureInfo {
                address: entry,
                param_count: decl.params.len(),
                stack_args,
            },
        )?;

        // Spilled copies sit above the save block, so they are pushed first.
        if spilled > 0 {
            let args: RegSet = (0..spilled).map(abi::arg_reg).collect();
            emit_save(e, Cond::Al, args);
        }
        if !saves.is_empty() {
            emit_save(e, Cond::Al, saves);
        }
        let mut base_set = false;
        if needs_base {
            e.emit(Instruction::MovReg {
                cond: Cond::Al,
                dst: decl.base.reg(),
                src: Reg::Sp,
            });
            base_set = true;
        }

        tracing::debug!(
            name = %decl.name,
            params = decl.params.len(),
            saved = saves.len(),
            "procedure opened"
        );
        Ok(Self {
            name: decl.name,
            layout: FrameLayout::new(decl.base, decl.spill, decl.params, saves),
            locals: LocalArea::new(),
            entry,
            base_set,
            call_lowered: false,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn entry(&self) -> u32 {
        self.entry
    }

    #[must_use]
    pub const fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    #[must_use]
    pub fn base_reg(&self) -> Reg {
        self.layout.base().reg()
    }

    /// Open a locals declaration block. The frame base is set up lazily here
    /// when the declaration alone did not already require it; sp has not
    /// moved since the prologue, so the captured value is the same.
    pub fn open_locals(&mut self, e: &mut Emitter) -> Result<()> {
        self.locals.open_block()?;
        if !self.base_set && self.layout.base() != FrameBase::Sp {
            let base = self.layout.base().reg();
            if !self.layout.saves().contains(base) {
                tracing::warn!(
                    procedure = %self.name,
                    base = %base,
                    "frame base register is not in the save set"
                );
            }
            e.emit(Instruction::MovReg {
                cond: Cond::Al,
                dst: base,
                src: Reg::Sp,
            });
            self.base_set = true;
        }
        Ok(())
    }

    pub fn declare_local(&mut self, name: &str, size: u32, align: u32) -> Result<i32> {
        if self.layout.param_index(name).is_some() {
            return Err(Error::DuplicateLocal(name.to_string()));
        }
        self.locals.declare(name, size, align)
    }

    pub fn declare_array(&mut self, name: &str, elem_size: u32, count: u32) -> Result<i32> {
        if self.layout.param_index(name).is_some() {
            return Err(Error::DuplicateLocal(name.to_string()));
        }
        self.locals.declare_array(name, elem_size, count)
    }

    /// Close the open locals block and reserve its (word-rounded) size.
    pub fn close_locals(&mut self, e: &mut Emitter) -> Result<()> {
        let bytes = self.locals.close_block()?;
        self.layout.add_locals(bytes);
        if bytes > 0 {
            e.emit(Instruction::AddImm {
                cond: Cond::Al,
                dst: Reg::Sp,
                src: Reg::Sp,
                value: -(bytes as i32),
            });
        }
        Ok(())
    }

    /// Resolve a name to its slot, parameters shadowing locals.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<SlotRef> {
        if let Some(index) = self.layout.param_index(name) {
            let slot = self.layout.param_slot(index);
            if let SlotRef::Reg(reg) = slot
                && self.call_lowered
            {
                tracing::warn!(
                    procedure = %self.name,
                    parameter = %name,
                    register = %reg,
                    "register-aliased parameter read after a call; the register may have been clobbered"
                );
            }
            return Some(slot);
        }
        self.locals
            .get(name)
            .map(|v| self.layout.local_slot(v.offset))
    }

    pub(crate) fn note_call_lowered(&mut self) {
        self.call_lowered = true;
    }

    /// Emit the epilogue: locals teardown, save-set restore and return. With
    /// an empty spill region the restore fuses with the return; otherwise
    /// the spilled bytes are popped between restore and `bx lr`.
    pub fn emit_return(&self, e: &mut Emitter, cond: Cond) {
        let locals = self.layout.locals_bytes();
        if locals > 0 {
            if self.base_set {
                e.emit(Instruction::MovReg {
                    cond,
                    dst: Reg::Sp,
                    src: self.base_reg(),
                });
            } else {
                e.emit(Instruction::AddImm {
                    cond,
                    dst: Reg::Sp,
                    src: Reg::Sp,
                    value: locals as i32,
                });
            }
        }
        let spilled = self.layout.spilled_bytes();
        if spilled > 0 {
            emit_restore(e, cond, self.layout.saves());
            e.emit(Instruction::AddImm {
                cond,
                dst: Reg::Sp,
                src: Reg::Sp,
                value: spilled as i32,
            });
            e.emit(Instruction::Bx { cond, reg: Reg::Lr });
        } else {
            emit_restore_and_return(e, cond, self.layout.saves());
        }
    }

    /// Close the procedure scope.
    pub fn finish(self) -> Result<()> {
        if self.locals.is_open() {
            return Err(Error::UnclosedLocalsBlock(self.name));
        }
        tracing::debug!(name = %self.name, "procedure closed");
        Ok(())
    }
}
