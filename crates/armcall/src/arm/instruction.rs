use std::fmt;

use super::{Cond, Reg, RegSet};

/// Memory access width with its extension behavior. Loads narrower than a
/// word zero- or sign-extend to 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemWidth {
    Word,
    Byte,
    SByte,
    Hword,
    SHword,
}

impl MemWidth {
    /// Mnemonic suffix appended to `ldr`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Word => "",
            Self::Byte => "b",
            Self::SByte => "sb",
            Self::Hword => "h",
            Self::SHword => "sh",
        }
    }
}

/// Base-register addressing mode for single loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// `[base, #offset]` — base unchanged.
    Offset,
    /// `[base, #offset]!` — base adjusted before the access.
    PreWriteback,
    /// `[base], #offset` — base adjusted after the access.
    PostIndex,
}

/// The instruction vocabulary the lowering emits.
///
/// This is the mnemonic level handed to the surrounding assembler's encoder;
/// every variant occupies exactly [`Instruction::BYTES`] in ARM state, which
/// is what makes position-relative address arithmetic possible at emit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `mov<c> dst, src`
    MovReg { cond: Cond, dst: Reg, src: Reg },
    /// `ldr<c> dst, =value` — materialize an arbitrary 32-bit constant.
    LoadImm { cond: Cond, dst: Reg, value: u32 },
    /// `add<c> dst, src, #imm` (rendered as `sub` for negative immediates).
    AddImm {
        cond: Cond,
        dst: Reg,
        src: Reg,
        value: i32,
    },
    /// `add<c> dst, pc, dst` — second half of the position-relative
    /// global-address idiom.
    AddPc { cond: Cond, dst: Reg },
    Ldr {
        cond: Cond,
        width: MemWidth,
        dst: Reg,
        base: Reg,
        offset: i32,
        index: IndexMode,
    },
    Str {
        cond: Cond,
        src: Reg,
        base: Reg,
        offset: i32,
        index: IndexMode,
    },
    /// Full-descending block store, `stmfd<c> base{!}, {regs}`.
    Stmfd {
        cond: Cond,
        base: Reg,
        writeback: bool,
        regs: RegSet,
    },
    /// Full-descending block load, `ldmfd<c> base{!}, {regs}`.
    Ldmfd {
        cond: Cond,
        base: Reg,
        writeback: bool,
        regs: RegSet,
    },
    /// `b<c> target` — used to skip interleaved literal data.
    B { cond: Cond, target: u32 },
    /// `bl<c> target` — position-relative call, reach ±32 MiB.
    Bl { cond: Cond, target: u32 },
    /// `blx<c> reg` — indirect call through a register.
    Blx { cond: Cond, reg: Reg },
    /// `bx<c> reg` — branch through a register; `bx lr` returns.
    Bx { cond: Cond, reg: Reg },
}

impl Instruction {
    /// Instruction width in ARM state.
    pub const BYTES: u32 = 4;
}

fn write_imm(f: &mut fmt::Formatter<'_>, value: u32) -> fmt::Result {
    if value < 0x1000 {
        write!(f, "{value}")
    } else {
        write!(f, "0x{value:x}")
    }
}

fn write_mem(f: &mut fmt::Formatter<'_>, base: Reg, offset: i32, index: IndexMode) -> fmt::Result {
    match index {
        IndexMode::Offset if offset == 0 => write!(f, "[{base}]"),
        IndexMode::Offset => write!(f, "[{base}, #{offset}]"),
        IndexMode::PreWriteback => write!(f, "[{base}, #{offset}]!"),
        IndexMode::PostIndex => write!(f, "[{base}], #{offset}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovReg { cond, dst, src } => write!(f, "mov{cond} {dst}, {src}"),
            Self::LoadImm { cond, dst, value } => {
                write!(f, "ldr{cond} {dst}, =")?;
                write_imm(f, *value)
            }
            Self::AddImm {
                cond,
                dst,
                src,
                value,
            } => {
                if *value < 0 {
                    write!(f, "sub{cond} {dst}, {src}, #{}", value.unsigned_abs())
                } else {
                    write!(f, "add{cond} {dst}, {src}, #{value}")
                }
            }
            Self::AddPc { cond, dst } => write!(f, "add{cond} {dst}, pc, {dst}"),
            Self::Ldr {
                cond,
                width,
                dst,
                base,
                offset,
                index,
            } => {
                write!(f, "ldr{}{cond} {dst}, ", width.suffix())?;
                write_mem(f, *base, *offset, *index)
            }
            Self::Str {
                cond,
                src,
                base,
                offset,
                index,
            } => {
                write!(f, "str{cond} {src}, ")?;
                write_mem(f, *base, *offset, *index)
            }
            Self::Stmfd {
                cond,
                base,
                writeback,
                regs,
            } => {
                let wb = if *writeback { "!" } else { "" };
                write!(f, "stmfd{cond} {base}{wb}, {regs}")
            }
            Self::Ldmfd {
                cond,
                base,
                writeback,
                regs,
            } => {
                let wb = if *writeback { "!" } else { "" };
                write!(f, "ldmfd{cond} {base}{wb}, {regs}")
            }
            Self::B { cond, target } => write!(f, "b{cond} 0x{target:x}"),
            Self::Bl { cond, target } => write!(f, "bl{cond} 0x{target:x}"),
            Self::Blx { cond, reg } => write!(f, "blx{cond} {reg}"),
            Self::Bx { cond, reg } => write!(f, "bx{cond} {reg}"),
        }
    }
}
