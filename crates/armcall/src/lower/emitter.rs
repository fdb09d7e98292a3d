//! Instruction-emission sink with running-address tracking.
//!
//! The emitter is the only component that knows where instructions land, so
//! position-relative address computation and the short-call range decision
//! both go through it. Call targets that are not yet placed are recorded as
//! fixups and patched by [`Emitter::resolve_fixups`] once the unit is
//! complete.

use crate::arm::{Cond, Instruction, Reg};
use crate::error::{Error, Result};
use crate::symtab::SymbolTable;

/// Execution state of the surrounding assembler.
///
/// The engine's sequences are fixed-width ARM instructions; invoking it from
/// Thumb state would interleave 2- and 4-byte instructions and break every
/// pc-relative displacement, so that is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsaMode {
    Arm,
    Thumb,
}

/// One element of the output stream: an instruction or an interleaved
/// read-only data block (materialized string literals, padded to word size).
#[derive(Debug, Clone)]
pub enum Item {
    Instr(Instruction),
    Data(Vec<u8>),
}

impl Item {
    #[must_use]
    pub fn byte_len(&self) -> u32 {
        match self {
            Self::Instr(_) => Instruction::BYTES,
            Self::Data(bytes) => bytes.len() as u32,
        }
    }
}

#[derive(Debug)]
struct CallFixup {
    item: usize,
    symbol: String,
}

#[derive(Debug)]
pub struct Emitter {
    items: Vec<Item>,
    origin: u32,
    cursor: u32,
    mode: IsaMode,
    fixups: Vec<CallFixup>,
}

impl Emitter {
    #[must_use]
    pub fn new(origin: u32) -> Self {
        Self::with_mode(origin, IsaMode::Arm)
    }

    #[must_use]
    pub fn with_mode(origin: u32, mode: IsaMode) -> Self {
        Self {
            items: Vec::new(),
            origin,
            cursor: origin,
            mode,
            fixups: Vec::new(),
        }
    }

    #[must_use]
    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Address the next emission will land at.
    #[must_use]
    pub fn here(&self) -> u32 {
        self.cursor
    }

    /// Sample the instruction stream state and refuse to lower outside ARM
    /// state. A misaligned cursor means the surrounding assembler has emitted
    /// halfword instructions.
    pub fn require_arm(&self) -> Result<()> {
        if self.mode == IsaMode::Thumb || self.cursor % Instruction::BYTES != 0 {
            return Err(Error::ThumbModeMisuse);
        }
        Ok(())
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.items.push(Item::Instr(instruction));
        self.cursor += Instruction::BYTES;
    }

    /// Append a read-only data block, padded to word size. Returns the
    /// address the block starts at.
    pub fn emit_data(&mut self, bytes: &[u8]) -> u32 {
        let address = self.cursor;
        let mut padded = bytes.to_vec();
        while padded.len() % Instruction::BYTES as usize != 0 {
            padded.push(0);
        }
        self.cursor += padded.len() as u32;
        self.items.push(Item::Data(padded));
        address
    }

    /// Emit a constant load whose value is a symbol address not yet known;
    /// the placeholder is patched during [`Self::resolve_fixups`].
    pub fn emit_load_fixup(&mut self, cond: Cond, dst: Reg, symbol: &str) {
        self.fixups.push(CallFixup {
            item: self.items.len(),
            symbol: symbol.to_string(),
        });
        self.emit(Instruction::LoadImm {
            cond,
            dst,
            value: 0,
        });
    }

    /// Patch every recorded fixup from the symbol table. Symbols still
    /// unknown at this point are a hard failure.
    pub fn resolve_fixups(&mut self, symbols: &SymbolTable) -> Result<()> {
        for fixup in &self.fixups {
            let address = symbols
                .address_of(&fixup.symbol)
                .ok_or_else(|| Error::UnresolvableSymbol(fixup.symbol.clone()))?;
            match self.items.get_mut(fixup.item) {
                Some(Item::Instr(Instruction::LoadImm { value, .. })) => *value = address,
                _ => {
                    return Err(Error::Internal(format!(
                        "fixup for '{}' does not point at a constant load",
                        fixup.symbol
                    )));
                }
            }
        }
        self.fixups.clear();
        Ok(())
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter().filter_map(|item| match item {
            Item::Instr(i) => Some(i),
            Item::Data(_) => None,
        })
    }

    /// Render the stream as an address-annotated assembly listing.
    #[must_use]
    pub fn listing(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut address = self.origin;
        for item in &self.items {
            match item {
                Item::Instr(i) => {
                    let _ = writeln!(out, "{address:08x}  {i}");
                }
                Item::Data(bytes) => {
                    let rendered: Vec<String> =
                        bytes.iter().map(|b| format!("0x{b:02x}")).collect();
                    let _ = writeln!(out, "{address:08x}  .byte {}", rendered.join(", "));
                }
            }
            address += item.byte_len();
        }
        out
    }
}
